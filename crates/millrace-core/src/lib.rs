//! Core types for the millrace pipeline engine
//!
//! This crate defines the data model shared by the engine and anything built
//! on top of it:
//!
//! - [`Element`] / [`FileRecord`]: the closed set of element variants a
//!   pipeline collection holds, with capability dispatch by variant tag
//! - [`ElementType`]: conversion between caller-facing types and the runtime
//!   element representation used by the executor
//! - [`Context`]: the per-pipeline metadata store
//! - [`HistoryEntry`] and the structural diff behind automatic history
//! - the front-matter extractor for text documents
//! - [`PipelineError`], the shared fail-fast error type
//!
//! The execution engine itself lives in `millrace-pipeline`; this crate
//! holds no stage or scheduling logic.

pub mod context;
pub mod element;
pub mod error;
pub mod frontmatter;
pub mod history;

pub use context::Context;
pub use element::{Element, ElementType, FileRecord};
pub use error::{PipelineError, Result};
pub use history::HistoryEntry;
