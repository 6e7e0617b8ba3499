//! Shared collection snapshot handed to stage callables
//!
//! Every stage callback receives the full input collection alongside its
//! element. The snapshot is an `Arc` over the stage's input, so cloning it
//! into concurrently running callbacks is cheap and nothing is copied until
//! a caller asks for a typed view.

use std::sync::Arc;

use millrace_core::{Element, ElementType, Result};

/// An immutable snapshot of the collection a stage is running over.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Arc<Vec<Element>>,
}

impl Collection {
    pub(crate) fn new(items: Arc<Vec<Element>>) -> Self {
        Self { items }
    }

    /// Number of elements in the snapshot.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow one element by its input index.
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.items.get(index)
    }

    /// Iterate over the elements in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.items.iter()
    }

    /// Borrow the underlying elements.
    pub fn elements(&self) -> &[Element] {
        &self.items
    }

    /// Decode the whole snapshot into a typed view.
    pub fn decode<T: ElementType>(&self) -> Result<Vec<T>> {
        self.items
            .iter()
            .map(|element| T::from_element(element.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_typed_view() {
        let items = Arc::new(vec![
            Element::Data(json!(1)),
            Element::Data(json!(2)),
        ]);
        let collection = Collection::new(items);

        assert_eq!(collection.len(), 2);
        let values: Vec<serde_json::Value> = collection.decode().unwrap();
        assert_eq!(values, vec![json!(1), json!(2)]);
    }
}
