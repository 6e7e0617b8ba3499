//! Filesystem materializer behind the READ and WRITE stages

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use millrace_core::{frontmatter, FileRecord, PipelineError, Result};
use std::collections::BTreeMap;

/// Suffixes whose documents are scanned for front matter.
const TEXT_SUFFIXES: [&str; 2] = ["md", "markdown"];

/// Expand a root-relative glob pattern to concrete file paths.
///
/// Matches that are not regular files (directories a broad pattern happens
/// to cover) are skipped.
pub(crate) fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = root.join(pattern);
    let entries = glob::glob(&full.to_string_lossy())
        .map_err(|e| PipelineError::pattern(e.to_string()))?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::pattern(e.to_string()))?;
        if path.is_file() {
            out.push(path);
        }
    }
    Ok(out)
}

/// Materialize one file into a [`FileRecord`].
pub(crate) async fn read_file(root: &Path, path: &Path) -> Result<FileRecord> {
    let metadata = tokio::fs::metadata(path).await?;
    let bytes = tokio::fs::read(path).await?;

    let hash = blake3::hash(&bytes).to_hex().to_string();
    let text = String::from_utf8(bytes)
        .map_err(|_| PipelineError::Encoding(path.to_path_buf()))?;

    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let (meta, contents) = if is_text_document(path) {
        let (meta, body) = frontmatter::extract(&text)?;
        (meta.unwrap_or_default(), body.to_string())
    } else {
        (BTreeMap::new(), text)
    };

    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

    Ok(FileRecord {
        path: path.to_path_buf(),
        relative_path,
        contents,
        extension,
        size: metadata.len(),
        modified: timestamp(metadata.modified()),
        accessed: timestamp(metadata.accessed()),
        created: timestamp(metadata.created()),
        hash,
        meta,
        history: Vec::new(),
    })
}

/// Write text contents, creating parent directories as needed.
pub(crate) async fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

fn is_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_SUFFIXES.contains(&ext))
}

/// Not every platform exposes every timestamp kind; fall back to the epoch
/// rather than failing the read.
fn timestamp(time: io::Result<SystemTime>) -> DateTime<Utc> {
    DateTime::from(time.unwrap_or(SystemTime::UNIX_EPOCH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_file_materializes_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "plain text").await.unwrap();

        let file = read_file(dir.path(), &path).await.unwrap();
        assert_eq!(file.relative_path, PathBuf::from("notes.txt"));
        assert_eq!(file.extension, ".txt");
        assert_eq!(file.contents, "plain text");
        assert_eq!(file.size, 10);
        assert_eq!(file.hash.len(), 64);
        assert!(file.meta.is_empty());
        assert!(file.history.is_empty());
    }

    #[tokio::test]
    async fn test_markdown_front_matter_is_merged_and_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("post.md");
        tokio::fs::write(&path, "---\ntitle: Foo\n---\n# Hi")
            .await
            .unwrap();

        let file = read_file(dir.path(), &path).await.unwrap();
        assert_eq!(file.contents, "# Hi");
        assert_eq!(file.meta_value("title"), Some(&serde_json::json!("Foo")));
    }

    #[tokio::test]
    async fn test_expand_skips_directories() {
        let dir = TempDir::new().unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("a.md"), "a").await.unwrap();
        tokio::fs::write(dir.path().join("sub/b.md"), "b")
            .await
            .unwrap();

        let mut paths = expand(dir.path(), "**/*").unwrap();
        paths.sort();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[tokio::test]
    async fn test_write_file_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/deep/page.html");
        write_file(&path, "<h1>Hi</h1>").await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "<h1>Hi</h1>");
    }
}
