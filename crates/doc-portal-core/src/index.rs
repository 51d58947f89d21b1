//! In-memory flat vector index and its binary payload codec.
//!
//! The index keeps `(vector, chunk)` pairs in insertion order and answers
//! nearest-neighbour queries with brute-force cosine similarity. It is
//! persisted as a single self-describing payload so one atomic file write
//! captures both the vectors and the docstore.
//!
//! # Payload layout
//!
//! All integers are little-endian.
//!
//! | Field | Size |
//! |-------|------|
//! | magic `DPVI` | 4 bytes |
//! | format version | `u32` |
//! | dims | `u32` |
//! | count | `u64` |
//! | vectors | `count × dims × f32` |
//! | docstore length | `u64` |
//! | docstore | JSON array of `{ "text", "metadata" }`, index-aligned |

use std::cmp::Ordering;

use thiserror::Error;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, ScoredChunk};

const MAGIC: &[u8; 4] = b"DPVI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("{vectors} vectors supplied for {chunks} chunks")]
    LengthMismatch { vectors: usize, chunks: usize },
    #[error("vector has {found} dims, index expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("payload truncated")]
    Truncated,
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u32),
    #[error("docstore has {docs} entries for {vectors} vectors")]
    DocstoreMismatch { docs: usize, vectors: usize },
    #[error("docstore JSON: {0}")]
    Docstore(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct Entry {
    vector: Vec<f32>,
    chunk: Chunk,
}

/// Flat cosine-similarity index over `(vector, chunk)` pairs.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dims: usize,
    entries: Vec<Entry>,
}

impl VectorIndex {
    fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
        }
    }

    /// Build an index from parallel vectors and chunks.
    ///
    /// Dimensionality is taken from the first vector.
    pub fn from_parts(vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<Self, IndexError> {
        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut index = Self::new(dims);
        index.add(vectors, chunks)?;
        Ok(index)
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Append pairs in the given order. Nothing is added on error.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<(), IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }
        if self.entries.is_empty() && self.dims == 0 {
            if let Some(first) = vectors.first() {
                self.dims = first.len();
            }
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dims) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                found: bad.len(),
            });
        }
        self.entries.extend(
            vectors
                .into_iter()
                .zip(chunks)
                .map(|(vector, chunk)| Entry { vector, chunk }),
        );
        Ok(())
    }

    /// Top-`k` chunks by descending cosine similarity to `query`.
    ///
    /// Ties keep insertion order. The caller is responsible for checking
    /// that `query` matches [`dims`](Self::dims).
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    /// Serialize vectors and docstore into one payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IndexError> {
        let docs: Vec<&Chunk> = self.chunks().collect();
        let docstore = serde_json::to_vec(&docs)?;

        let mut out =
            Vec::with_capacity(HEADER_LEN + self.len() * self.dims * 4 + 8 + docstore.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.entries.len() as u64).to_le_bytes());
        for e in &self.entries {
            out.extend_from_slice(&vec_to_blob(&e.vector));
        }
        out.extend_from_slice(&(docstore.len() as u64).to_le_bytes());
        out.extend_from_slice(&docstore);
        Ok(out)
    }

    /// Decode a payload produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN {
            return Err(IndexError::Truncated);
        }
        if &bytes[0..4] != MAGIC {
            return Err(IndexError::BadMagic);
        }
        let version = read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(version));
        }
        let dims = read_u32(&bytes[8..12]) as usize;
        let count = read_u64(&bytes[12..20]) as usize;

        let vec_bytes = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or(IndexError::Truncated)?;
        let vec_end = HEADER_LEN
            .checked_add(vec_bytes)
            .ok_or(IndexError::Truncated)?;
        if bytes.len() < vec_end + 8 {
            return Err(IndexError::Truncated);
        }
        let doc_len = read_u64(&bytes[vec_end..vec_end + 8]) as usize;
        let doc_start = vec_end + 8;
        let doc_end = doc_start.checked_add(doc_len).ok_or(IndexError::Truncated)?;
        if bytes.len() < doc_end {
            return Err(IndexError::Truncated);
        }

        let chunks: Vec<Chunk> = serde_json::from_slice(&bytes[doc_start..doc_end])?;
        if chunks.len() != count {
            return Err(IndexError::DocstoreMismatch {
                docs: chunks.len(),
                vectors: count,
            });
        }

        let stride = dims * 4;
        let entries = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let start = HEADER_LEN + i * stride;
                Entry {
                    vector: blob_to_vec(&bytes[start..start + stride]),
                    chunk,
                }
            })
            .collect();

        Ok(Self { dims, entries })
    }
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&b[..8]);
    u64::from_le_bytes(buf)
}
