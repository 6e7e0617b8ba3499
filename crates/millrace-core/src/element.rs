//! Element model for pipeline collections
//!
//! Elements travel through the pipeline as [`Element`] values, a closed set
//! of variants dispatched by tag: plain data records and file records. File
//! records are the history-bearing elements; every MAP stage that produces
//! one gets a structural diff appended to its history.
//!
//! The typed builder surface works in terms of [`ElementType`], which
//! converts between a caller-facing Rust type and the runtime [`Element`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::history::HistoryEntry;

/// A file-like element: contents plus filesystem identity and metadata.
///
/// Front-matter keys live in `meta` and are flattened into the serialized
/// form, so a document with `title: Foo` front matter serializes with a
/// top-level `"title"` field alongside `"contents"` and the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path the file was read from
    pub path: PathBuf,

    /// Path relative to the pipeline root; WRITE re-roots this under the
    /// configured output directory
    pub relative_path: PathBuf,

    /// Textual contents, with any front-matter block stripped
    pub contents: String,

    /// Extension with its leading dot (`.md`), empty when the path has none
    pub extension: String,

    /// File size in bytes at read time
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Utc>,

    /// Last access time
    pub accessed: DateTime<Utc>,

    /// Creation time; `UNIX_EPOCH` where the platform does not expose it
    pub created: DateTime<Utc>,

    /// Hex BLAKE3 digest of the raw file content
    pub hash: String,

    /// Front-matter metadata merged onto the element
    #[serde(flatten)]
    pub meta: BTreeMap<String, Value>,

    /// Mutation history; one entry per MAP stage that produced this record
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl FileRecord {
    /// Look up a front-matter value by key.
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Rewrite the extension on `extension`, `path` and `relative_path`.
    ///
    /// Accepts the extension with or without its leading dot. Typical for
    /// transform stages that change the content format, e.g. `.md` to
    /// `.html` after markdown rendering.
    pub fn set_extension(&mut self, extension: &str) {
        let bare = extension.trim_start_matches('.');
        self.extension = format!(".{bare}");
        self.path = self.path.with_extension(bare);
        self.relative_path = self.relative_path.with_extension(bare);
    }
}

/// Runtime representation of one pipeline element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Element {
    /// A file-like, history-bearing element
    File(Box<FileRecord>),
    /// A plain data record (FETCH/FROM payloads, reduce results, ...)
    Data(Value),
}

impl Element {
    /// Tag name used in shape errors and traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::File(_) => "file",
            Element::Data(_) => "data",
        }
    }

    /// Borrow the file record, if this is a file element.
    pub fn as_file(&self) -> Option<&FileRecord> {
        match self {
            Element::File(file) => Some(file),
            Element::Data(_) => None,
        }
    }

    /// Mutably borrow the file record, if this is a file element.
    pub fn as_file_mut(&mut self) -> Option<&mut FileRecord> {
        match self {
            Element::File(file) => Some(file),
            Element::Data(_) => None,
        }
    }

    /// Serialize to a JSON value (file records flatten their front matter).
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<FileRecord> for Element {
    fn from(file: FileRecord) -> Self {
        Element::File(Box::new(file))
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::Data(value)
    }
}

/// Conversion between a caller-facing element type and the runtime
/// [`Element`] threaded through the executor.
///
/// Implemented for [`Element`] itself (the fully dynamic view),
/// [`FileRecord`], and [`serde_json::Value`]. A failed conversion is a
/// stage failure: composing a file-typed stage after a stage that produces
/// plain data fails at run time with [`PipelineError::Shape`].
pub trait ElementType: Clone + Send + Sync + 'static {
    /// Wrap this value as a runtime element.
    fn into_element(self) -> Element;

    /// Recover this type from a runtime element.
    fn from_element(element: Element) -> Result<Self>;
}

impl ElementType for Element {
    fn into_element(self) -> Element {
        self
    }

    fn from_element(element: Element) -> Result<Self> {
        Ok(element)
    }
}

impl ElementType for FileRecord {
    fn into_element(self) -> Element {
        Element::File(Box::new(self))
    }

    fn from_element(element: Element) -> Result<Self> {
        match element {
            Element::File(file) => Ok(*file),
            Element::Data(value) => serde_json::from_value(value)
                .map_err(|_| PipelineError::shape("file", "data")),
        }
    }
}

impl ElementType for Value {
    fn into_element(self) -> Element {
        Element::Data(self)
    }

    fn from_element(element: Element) -> Result<Self> {
        element.to_json()
    }
}
