//! Per-session folders for uploaded documents.
//!
//! Each upload batch lands in `<base_dir>/<session_id>/`. Session ids look
//! like `Session_20250101_120000_1a2b3c4d` so folders sort chronologically.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// File extensions accepted for upload (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

/// `Session_<UTC yyyymmdd_hhmmss>_<8 hex>`.
pub fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "Session_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    base_dir: PathBuf,
    session_id: String,
    session_path: PathBuf,
}

impl SessionManager {
    /// Create (or reopen) a session folder under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, session_id: Option<String>) -> Result<Self> {
        let base_dir = base_dir.into();
        let session_id = session_id.unwrap_or_else(generate_session_id);
        let session_path = base_dir.join(&session_id);
        fs::create_dir_all(&session_path).with_context(|| {
            format!("Failed to create session folder {}", session_path.display())
        })?;
        info!(
            base_dir = %base_dir.display(),
            session_id = %session_id,
            "session initialized"
        );
        Ok(Self {
            base_dir,
            session_id,
            session_path,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Store an uploaded document in the session folder.
    ///
    /// Only the file name component of `name` is used.
    pub fn save_document(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .with_context(|| format!("Invalid upload name: {:?}", name))?;
        let target = self.session_path.join(file_name);
        if !is_supported(&target) {
            bail!(
                "Invalid file type: {}. Supported: {}",
                name,
                SUPPORTED_EXTENSIONS.join(", ")
            );
        }
        fs::write(&target, bytes)
            .with_context(|| format!("Failed to save {}", target.display()))?;
        info!(
            file = %target.display(),
            session_id = %self.session_id,
            bytes = bytes.len(),
            "document saved"
        );
        Ok(target)
    }

    /// Copy an existing file into the session folder.
    pub fn import_file(&self, source: &Path) -> Result<PathBuf> {
        let bytes =
            fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
        self.save_document(&source.to_string_lossy(), &bytes)
    }

    /// Supported documents currently in the session folder, sorted by name.
    pub fn documents(&self) -> Result<Vec<PathBuf>> {
        let mut docs: Vec<PathBuf> = fs::read_dir(&self.session_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_supported(p))
            .collect();
        docs.sort();
        Ok(docs)
    }

    /// Remove all but the `keep_latest` most recently modified sessions.
    pub fn clean_old_sessions(&self, keep_latest: usize) -> Result<Vec<PathBuf>> {
        clean_old_sessions(&self.base_dir, keep_latest)
    }
}

/// Remove all but the `keep_latest` most recently modified folders in `base_dir`.
///
/// Returns the removed paths.
pub fn clean_old_sessions(base_dir: &Path, keep_latest: usize) -> Result<Vec<PathBuf>> {
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sessions = Vec::new();
    for entry in fs::read_dir(base_dir)
        .with_context(|| format!("Failed to list {}", base_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let modified = entry.metadata()?.modified()?;
            sessions.push((modified, path));
        }
    }
    sessions.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = Vec::new();
    for (_, path) in sessions.into_iter().skip(keep_latest) {
        fs::remove_dir_all(&path)
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        info!(path = %path.display(), "old session folder deleted");
        removed.push(path);
    }
    Ok(removed)
}
