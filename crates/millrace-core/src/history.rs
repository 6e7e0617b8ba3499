//! Mutation history for file elements
//!
//! MAP stages snapshot each element before invoking the transform. When the
//! transform produces a file element, the structural difference between the
//! snapshot and the result is appended as a history entry. History is
//! cumulative and monotonic: entries are never removed or renumbered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::element::Element;
use crate::error::Result;

/// One appended mutation record: a monotonic id and the changed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based id; equals the history length at append time plus one
    pub id: u64,

    /// Changed field -> new value; removed fields map to `null`
    pub patch: BTreeMap<String, Value>,
}

/// Append a history entry to `after` when it is a file element.
///
/// The diff is field-by-field over the serialized form: front-matter keys
/// compare as top-level fields, a changed nested value is recorded wholesale
/// as its new value, and the `history` field itself is excluded. Non-file
/// results pass through untouched.
pub fn record(before: &Element, after: Element) -> Result<Element> {
    let mut file = match after {
        Element::File(file) => file,
        other => return Ok(other),
    };

    let before = before.to_json()?;
    let after_json = serde_json::to_value(&*file)?;
    let patch = diff(&before, &after_json);

    let entry = HistoryEntry {
        id: file.history.len() as u64 + 1,
        patch,
    };
    file.history.push(entry);

    Ok(Element::File(file))
}

/// Field-level difference between two serialized elements.
///
/// A non-object `before` (a plain scalar record, say) contributes no prior
/// fields, so every field of `after` lands in the patch.
fn diff(before: &Value, after: &Value) -> BTreeMap<String, Value> {
    let empty = Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let mut patch = BTreeMap::new();
    for (key, value) in after {
        if key == "history" {
            continue;
        }
        if before.get(key) != Some(value) {
            patch.insert(key.clone(), value.clone());
        }
    }
    for key in before.keys() {
        if key == "history" {
            continue;
        }
        if !after.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::FileRecord;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn file(contents: &str) -> FileRecord {
        FileRecord {
            path: PathBuf::from("/work/a.md"),
            relative_path: PathBuf::from("a.md"),
            contents: contents.to_string(),
            extension: ".md".to_string(),
            size: contents.len() as u64,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            accessed: DateTime::<Utc>::UNIX_EPOCH,
            created: DateTime::<Utc>::UNIX_EPOCH,
            hash: "h".to_string(),
            meta: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    #[test]
    fn test_patch_contains_only_changed_fields() {
        let before: Element = file("old").into();
        let mut changed = file("new");
        changed.meta.insert("title".to_string(), json!("Foo"));

        let out = record(&before, changed.into()).unwrap();
        let history = &out.as_file().unwrap().history;

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, 1);
        assert_eq!(
            history[0].patch,
            BTreeMap::from([
                ("contents".to_string(), json!("new")),
                ("title".to_string(), json!("Foo")),
            ])
        );
    }

    #[test]
    fn test_unchanged_element_appends_empty_patch() {
        let before: Element = file("same").into();
        let out = record(&before, file("same").into()).unwrap();
        let history = &out.as_file().unwrap().history;

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, 1);
        assert!(history[0].patch.is_empty());
    }

    #[test]
    fn test_removed_field_patches_to_null() {
        let mut with_meta = file("body");
        with_meta.meta.insert("draft".to_string(), json!(true));
        let before: Element = with_meta.into();

        let out = record(&before, file("body").into()).unwrap();
        let history = &out.as_file().unwrap().history;

        assert_eq!(history[0].patch.get("draft"), Some(&Value::Null));
    }

    #[test]
    fn test_ids_stay_monotonic_across_records() {
        let first = record(&file("a").into(), file("b").into()).unwrap();
        let second = record(&first, {
            let mut f = first.as_file().unwrap().clone();
            f.contents = "c".to_string();
            f.into()
        })
        .unwrap();

        let history = &second.as_file().unwrap().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, 1);
        assert_eq!(history[1].id, 2);
        assert_eq!(history[1].patch.get("contents"), Some(&json!("c")));
    }

    #[test]
    fn test_non_file_results_are_unaffected() {
        let before = Element::Data(json!({ "n": 1 }));
        let out = record(&before, Element::Data(json!({ "n": 2 }))).unwrap();
        assert_eq!(out, Element::Data(json!({ "n": 2 })));
    }
}
