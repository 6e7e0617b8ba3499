//! Per-pipeline metadata context
//!
//! Every pipeline owns one [`Context`]: the working root path plus a
//! key/value store. Only the SET stage mutates the store; stage callbacks
//! receive a shared snapshot taken when their stage starts. Forked and
//! nested pipelines get an independent copy.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata context owned by one pipeline instance.
#[derive(Debug, Clone)]
pub struct Context {
    root: PathBuf,
    meta: BTreeMap<String, Value>,
}

impl Context {
    /// Create a context rooted at `root` with an empty store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            meta: BTreeMap::new(),
        }
    }

    /// The pipeline's working root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Store a metadata value under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.meta.insert(key.into(), value);
    }

    /// Whether a metadata key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    /// Number of stored metadata entries.
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = Context::new("/work");
        assert!(ctx.is_empty());

        ctx.set("site", json!({ "title": "Millrace" }));
        ctx.set("draft", json!(false));

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("draft"), Some(&json!(false)));
        assert!(ctx.get("missing").is_none());
        assert_eq!(ctx.root(), Path::new("/work"));
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let mut ctx = Context::new("/work");
        ctx.set("count", json!(1));
        ctx.set("count", json!(2));
        assert_eq!(ctx.get("count"), Some(&json!(2)));
        assert_eq!(ctx.len(), 1);
    }
}
