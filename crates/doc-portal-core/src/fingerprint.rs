//! Dedup keys for chunks.
//!
//! A chunk that claims a source file is keyed by `source::row_id`, so two
//! chunks from the same file and row collapse to one key even when their
//! text differs. Chunks without a source fall back to a SHA-256 hex digest
//! of their text.
//!
//! ```rust
//! use doc_portal_core::fingerprint::fingerprint;
//! use doc_portal_core::models::Metadata;
//!
//! let mut md = Metadata::new();
//! md.insert("source".into(), "a.pdf".into());
//! md.insert("row_id".into(), 1.into());
//! assert_eq!(fingerprint("any text", &md), "a.pdf::1");
//! ```

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{Chunk, Metadata};

/// Derive the dedup key for a chunk's text and metadata.
///
/// `source` wins when it is truthy; otherwise `file_path` is used when it is
/// present and not null. `row_id` renders as an empty string when absent.
/// Strings are used raw; any other JSON value is rendered as JSON text, so
/// `true` stays `true` and `1.5` stays `1.5`.
pub fn fingerprint(text: &str, metadata: &Metadata) -> String {
    let source = match metadata.get("source") {
        Some(v) if is_truthy(v) => Some(v),
        _ => metadata.get("file_path").filter(|v| !v.is_null()),
    };

    match source {
        Some(src) => {
            let row = metadata
                .get("row_id")
                .filter(|v| !v.is_null())
                .map(render)
                .unwrap_or_default();
            format!("{}::{}", render(src), row)
        }
        None => content_hash(text),
    }
}

pub fn chunk_fingerprint(chunk: &Chunk) -> String {
    fingerprint(&chunk.text, &chunk.metadata)
}

/// Lowercase hex SHA-256 of the UTF-8 text (64 characters).
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Raw string contents, or the JSON text of a non-string value.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
