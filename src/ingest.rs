//! Idempotent ingestion into a persisted vector index.
//!
//! [`IngestionManager`] owns one index directory for its lifetime (guarded
//! by an advisory lock) and moves through two states:
//!
//! ```text
//! Uninitialized ──create_or_load──▶ Loaded ──add──▶ Loaded
//! ```
//!
//! `add` fingerprints every chunk, drops the ones already in the ledger (or
//! repeated earlier in the same batch), embeds the survivors in order,
//! persists the index, and only then persists the ledger. A crash between
//! the two writes can leave vectors the ledger does not know about, but
//! never a ledger entry without its vector.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use doc_portal_core::embedding::{embed_batched, Embedder};
use doc_portal_core::fingerprint::chunk_fingerprint;
use doc_portal_core::index::VectorIndex;
use doc_portal_core::models::Chunk;
use doc_portal_core::{Error, Result};

use crate::ledger::Ledger;
use crate::store::{self, DirLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Loaded,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub vectors: usize,
    pub dims: usize,
    pub ledger_rows: usize,
}

pub struct IngestionManager {
    index_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    options: IngestOptions,
    ledger: Ledger,
    index: Option<VectorIndex>,
    _lock: DirLock,
}

impl IngestionManager {
    /// Open (creating if needed) `index_dir` and take its writer lock.
    ///
    /// The index itself is not loaded until [`create_or_load`](Self::create_or_load).
    pub fn open(
        index_dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        options: IngestOptions,
    ) -> Result<Self> {
        let index_dir = index_dir.into();
        std::fs::create_dir_all(&index_dir).map_err(|e| Error::io("open", &index_dir, e))?;
        let lock = DirLock::acquire(&index_dir, "open")?;
        let ledger = Ledger::load(&index_dir)?;
        debug!(
            index_dir = %index_dir.display(),
            ledger_rows = ledger.len(),
            "index directory opened"
        );

        Ok(Self {
            index_dir,
            embedder,
            options,
            ledger,
            index: None,
            _lock: lock,
        })
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Whether a persisted index payload is present on disk.
    pub fn exists(&self) -> bool {
        store::index_exists(&self.index_dir)
    }

    pub fn state(&self) -> IndexState {
        if self.index.is_some() {
            IndexState::Loaded
        } else {
            IndexState::Uninitialized
        }
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            vectors: self.index.as_ref().map(VectorIndex::len).unwrap_or(0),
            dims: self.index.as_ref().map(VectorIndex::dims).unwrap_or(0),
            ledger_rows: self.ledger.len(),
        }
    }

    /// Load the persisted index, or create one from `seed`.
    ///
    /// Loading never needs seed data. Creating requires a non-empty seed
    /// and fails with [`Error::Configuration`] otherwise. A new index has no
    /// vectors, so any ledger left on disk is discarded: the seed is only
    /// deduplicated within itself and its fingerprints replace the ledger.
    pub fn create_or_load(&mut self, seed: Option<&[Chunk]>) -> Result<&VectorIndex> {
        if self.exists() {
            let index = store::load_index(&self.index_dir, "create_or_load")?;
            info!(
                index_dir = %self.index_dir.display(),
                vectors = index.len(),
                "loaded persisted index"
            );
            return Ok(self.index.insert(index));
        }

        let seed = match seed {
            Some(chunks) if !chunks.is_empty() => chunks,
            _ => {
                return Err(Error::configuration(
                    "create_or_load",
                    format!(
                        "no persisted index at {} and no seed data to create one",
                        self.index_dir.display()
                    ),
                ))
            }
        };

        if !self.ledger.is_empty() {
            warn!(
                index_dir = %self.index_dir.display(),
                stale_rows = self.ledger.len(),
                "ledger present without an index, starting a new ledger"
            );
        }
        let (novel, fingerprints) = novel_chunks(&Ledger::default(), seed);
        let vectors = self.embed(&novel, "create_or_load")?;
        let index = VectorIndex::from_parts(vectors, novel).map_err(|e| {
            Error::provider("create_or_load", self.embedder.model_name(), e)
        })?;

        store::save_index(&self.index_dir, &index, "create_or_load")?;
        self.commit_ledger(Ledger::default(), fingerprints)?;

        info!(
            index_dir = %self.index_dir.display(),
            vectors = index.len(),
            "created new index"
        );
        Ok(self.index.insert(index))
    }

    /// Append the chunks not yet ingested; returns how many were added.
    ///
    /// Requires [`IndexState::Loaded`]. When every chunk is a duplicate
    /// nothing is embedded or written.
    pub fn add(&mut self, chunks: &[Chunk]) -> Result<usize> {
        let current = self.index.as_ref().ok_or(Error::NotReady {
            operation: "add",
            required: "create_or_load",
        })?;

        let (novel, fingerprints) = novel_chunks(&self.ledger, chunks);
        if novel.is_empty() {
            debug!(submitted = chunks.len(), "all chunks already ingested");
            return Ok(0);
        }
        let added = novel.len();

        let vectors = self.embed(&novel, "add")?;
        let mut next = current.clone();
        next.add(vectors, novel)
            .map_err(|e| Error::provider("add", self.embedder.model_name(), e))?;

        store::save_index(&self.index_dir, &next, "add")?;
        self.index = Some(next);
        self.commit_ledger(self.ledger.clone(), fingerprints)?;

        info!(
            index_dir = %self.index_dir.display(),
            submitted = chunks.len(),
            added,
            "ingested chunks"
        );
        Ok(added)
    }

    fn embed(&self, chunks: &[Chunk], operation: &'static str) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        embed_batched(
            self.embedder.as_ref(),
            &texts,
            self.options.batch_size,
            operation,
        )
    }

    /// Persist `base` plus `fingerprints` as the ledger; memory follows disk.
    fn commit_ledger(&mut self, base: Ledger, fingerprints: Vec<String>) -> Result<()> {
        let mut next = base;
        for key in fingerprints {
            next.insert(key);
        }
        next.save(&self.index_dir)?;
        self.ledger = next;
        Ok(())
    }
}

/// Chunks whose fingerprint is neither in `ledger` nor earlier in the
/// batch, in input order, with their keys.
fn novel_chunks(ledger: &Ledger, chunks: &[Chunk]) -> (Vec<Chunk>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut novel = Vec::new();
    let mut fingerprints = Vec::new();
    for chunk in chunks {
        let key = chunk_fingerprint(chunk);
        if ledger.contains(&key) || !seen.insert(key.clone()) {
            continue;
        }
        novel.push(chunk.clone());
        fingerprints.push(key);
    }
    (novel, fingerprints)
}
