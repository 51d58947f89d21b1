//! Turn files on disk into chunks ready for ingestion.
//!
//! Every chunk carries `source` (the file name), `file_path` (the full
//! path as given) and `row_id` (its position in the file). Re-loading the
//! same file yields the same fingerprints, which is what makes repeated
//! ingestion idempotent.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use doc_portal_core::chunk::chunk_document;
use doc_portal_core::models::{Chunk, Metadata};

use crate::extract::extract_file;

/// Extract and chunk one file.
pub fn load_file(path: &Path, max_tokens: usize) -> Result<Vec<Chunk>> {
    let text = extract_file(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let chunks = chunk_document(&text, &file_metadata(path), max_tokens);
    debug!(
        file = %path.display(),
        chars = text.len(),
        chunks = chunks.len(),
        "file loaded"
    );
    if chunks.is_empty() {
        warn!(file = %path.display(), "no text extracted");
    }
    Ok(chunks)
}

/// Load several files, skipping (and logging) the ones that fail.
///
/// Returns the chunks in file order plus the files that were skipped.
pub fn load_files<P: AsRef<Path>>(paths: &[P], max_tokens: usize) -> (Vec<Chunk>, Vec<String>) {
    let mut chunks = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_file(path, max_tokens) {
            Ok(mut loaded) => chunks.append(&mut loaded),
            Err(e) => {
                warn!(file = %path.display(), error = %format!("{e:#}"), "skipping file");
                skipped.push(path.display().to_string());
            }
        }
    }
    (chunks, skipped)
}

fn file_metadata(path: &Path) -> Metadata {
    let mut meta = Metadata::new();
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    meta.insert("source".to_string(), Value::String(source));
    meta.insert(
        "file_path".to_string(),
        Value::String(path.display().to_string()),
    );
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_portal_core::fingerprint::chunk_fingerprint;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_chunks_carry_source_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "first paragraph\n\nsecond paragraph").unwrap();

        let chunks = load_file(&path, 4).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata["source"], "notes.txt");
        assert_eq!(
            chunks[1].metadata["file_path"],
            path.display().to_string().as_str()
        );
        assert_eq!(chunk_fingerprint(&chunks[0]), "notes.txt::0");
        assert_eq!(chunk_fingerprint(&chunks[1]), "notes.txt::1");
    }

    #[test]
    fn test_reload_is_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "# Title\n\nBody text.").unwrap();
        let first: Vec<String> = load_file(&path, 700)
            .unwrap()
            .iter()
            .map(chunk_fingerprint)
            .collect();
        let second: Vec<String> = load_file(&path, 700)
            .unwrap()
            .iter()
            .map(chunk_fingerprint)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_files_skips_bad_entries() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.txt");
        fs::write(&good, "hello").unwrap();
        let missing = tmp.path().join("missing.txt");
        let unsupported = tmp.path().join("image.png");
        fs::write(&unsupported, [0u8; 4]).unwrap();

        let (chunks, skipped) = load_files(&[good, missing, unsupported], 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(skipped.len(), 2);
    }
}
