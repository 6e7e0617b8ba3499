//! Shared error type for the pipeline engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by pipeline execution.
///
/// Execution is fail-fast: the first stage that produces one of these aborts
/// the run and the error is delivered to the caller unmodified.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO error from a filesystem collaborator
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Directory pattern could not be expanded
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Front-matter block could not be parsed
    #[error("Front matter parse error: {0}")]
    FrontMatter(String),

    /// File content is not valid UTF-8
    #[error("Invalid UTF-8 encoding in file: {0}")]
    Encoding(PathBuf),

    /// Element (de)serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An element did not have the shape a stage required
    #[error("Expected a {expected} element, found a {found} element")]
    Shape {
        /// Element kind the stage required
        expected: &'static str,
        /// Element kind actually present
        found: &'static str,
    },

    /// WRITE invoked against elements lacking paths or contents
    #[error("Cannot write elements without relative paths and contents")]
    NotWritable,

    /// Failure raised by a user-supplied stage callback, propagated unmodified
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

/// Specialized Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a pattern expansion error
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern(msg.into())
    }

    /// Create a front-matter error
    pub fn front_matter(msg: impl Into<String>) -> Self {
        Self::FrontMatter(msg.into())
    }

    /// Create an element shape error
    pub fn shape(expected: &'static str, found: &'static str) -> Self {
        Self::Shape { expected, found }
    }
}
