//! Deferred, typed pipeline engine
//!
//! This crate provides the fluent builder and executor for millrace
//! pipelines: ordered programs of asynchronous transformation stages over
//! an evolving collection of elements, typically file records.
//!
//! ## Architecture
//!
//! Building is pure bookkeeping: every builder call appends one stage
//! record and nothing touches the filesystem or runs a callback until
//! [`Pipeline::run`]. The executor then threads a single collection through
//! the stages in append order, fail-fast. MAP and WRITE fan out per-element
//! work concurrently; every other stage is strictly sequential, which is
//! what gives REDUCE its fold semantics and FILTER/LOG their ordering
//! guarantees. File elements produced by MAP stages accumulate structural
//! diff history automatically.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use millrace_pipeline::{FileRecord, Pipeline};
//!
//! let rendered = Pipeline::new("site")
//!     .set("title", "My Site")
//!     .read("posts/**/*.md")
//!     .filter(|file: FileRecord, _, _| async move {
//!         Ok(file.meta_value("draft") != Some(&serde_json::json!(true)))
//!     })
//!     .map(|mut file: FileRecord, _all, _ctx| async move {
//!         file.contents = render_markdown(&file.contents);
//!         file.set_extension("html");
//!         Ok(file)
//!     })
//!     .write("public")
//!     .run()
//!     .await?;
//! ```

pub mod builder;
pub mod collection;
pub mod fetch;

mod executor;
mod fs;
mod sort;
mod stage;

pub use builder::{Accumulator, IntoPatterns, Pipeline};
pub use collection::Collection;
pub use fetch::Fetched;

// Re-export the core model so downstream crates can depend on this crate
// alone.
pub use millrace_core::{
    Context, Element, ElementType, FileRecord, HistoryEntry, PipelineError, Result,
};
