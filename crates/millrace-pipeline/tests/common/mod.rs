//! Common test utilities for pipeline tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use millrace_pipeline::FileRecord;
use tempfile::TempDir;

/// Initialize tracing once for tests that want stage traces; respects
/// `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Create a pipeline root containing the given relative-path/contents pairs.
pub fn make_root(files: &[(&str, &str)]) -> TempDir {
    let root = TempDir::new().expect("create temp root");
    for (relative, contents) in files {
        let path = root.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture");
    }
    root
}

/// A file record built by hand, for tests that do not go through READ.
#[allow(dead_code)]
pub fn sample_file(relative: &str, contents: &str) -> FileRecord {
    FileRecord {
        path: PathBuf::from("/virtual").join(relative),
        relative_path: PathBuf::from(relative),
        contents: contents.to_string(),
        extension: PathBuf::from(relative)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
        size: contents.len() as u64,
        modified: DateTime::<Utc>::UNIX_EPOCH,
        accessed: DateTime::<Utc>::UNIX_EPOCH,
        created: DateTime::<Utc>::UNIX_EPOCH,
        hash: String::new(),
        meta: BTreeMap::new(),
        history: Vec::new(),
    }
}
