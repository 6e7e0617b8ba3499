//! Front-matter extraction for text documents
//!
//! A front-matter block is a leading delimiter line (`---` or `...`),
//! a YAML mapping, and a closing delimiter line of either kind. The mapping
//! is merged onto the file element and the whole block, closing delimiter
//! included, is stripped from the contents. A document without a closing
//! delimiter has no front matter and is left untouched.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};

/// Split a document into an optional front-matter mapping and the body.
pub fn extract(content: &str) -> Result<(Option<BTreeMap<String, Value>>, &str)> {
    let Some((first, rest)) = content.split_once('\n') else {
        return Ok((None, content));
    };
    if !is_delimiter(first) {
        return Ok((None, content));
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if is_delimiter(line) {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some(parse_block(block)?), body));
        }
        offset += line.len();
    }

    // No closing delimiter: the document has no front matter.
    Ok((None, content))
}

/// Whether a line is a front-matter fence, ignoring the line terminator.
fn is_delimiter(line: &str) -> bool {
    let line = line.trim_end_matches('\n').trim_end_matches('\r');
    line == "---" || line == "..."
}

/// Parse the block interior as a YAML mapping.
fn parse_block(block: &str) -> Result<BTreeMap<String, Value>> {
    if block.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(block).map_err(|e| PipelineError::front_matter(e.to_string()))
}
