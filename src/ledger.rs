//! The ingested-rows ledger (`ingested_meta.json`).
//!
//! Records which fingerprints already have a vector in the persisted index.
//! The ledger is only ever written after the index write it describes has
//! succeeded.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use doc_portal_core::{Error, Result};

use crate::store::{ledger_path, write_atomic};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    rows: BTreeMap<String, bool>,
}

impl Ledger {
    /// Read the ledger in `dir`; a missing file is an empty ledger.
    ///
    /// An unreadable file is reported as [`Error::Corrupt`] rather than
    /// silently reset, since resetting would let duplicates back in.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = ledger_path(dir);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io("load_ledger", path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&text).map_err(|e| Error::Corrupt {
            operation: "load_ledger",
            path,
            reason: e.to_string(),
        })
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = ledger_path(dir);
        let json = serde_json::to_vec_pretty(self).map_err(|source| Error::Json {
            operation: "save_ledger",
            source,
        })?;
        write_atomic(&path, &json, "save_ledger")?;
        Ok(path)
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.rows.contains_key(fingerprint)
    }

    /// Record a fingerprint; returns false if it was already present.
    pub fn insert(&mut self, fingerprint: String) -> bool {
        self.rows.insert(fingerprint, true).is_none()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
