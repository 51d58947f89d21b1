//! Top-k retrieval over a loaded [`VectorIndex`].

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{embed_query, Embedder};
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::{Chunk, ScoredChunk};

/// Default number of chunks handed to the answer step.
pub const DEFAULT_K: usize = 5;

/// A retriever bound to one index snapshot.
///
/// The snapshot is shared, not copied; writes made to the on-disk index
/// after the snapshot was loaded are not visible here.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.index)
            .field("k", &self.k)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::configuration("retriever", "k must be >= 1"));
        }
        Ok(Self { index, embedder, k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve with the bound `k`.
    pub fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        self.retrieve_k(query, self.k)
    }

    /// Chunks most similar to `query`, most similar first, at most `k`.
    pub fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    /// Like [`retrieve_k`](Self::retrieve_k) but keeps the scores.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_vec = embed_query(self.embedder.as_ref(), query, "retrieve")?;
        if !self.index.is_empty() && query_vec.len() != self.index.dims() {
            return Err(Error::provider(
                "retrieve",
                self.embedder.model_name(),
                anyhow::anyhow!(
                    "query vector has {} dims, index expects {}",
                    query_vec.len(),
                    self.index.dims()
                ),
            ));
        }
        let hits = self.index.search(&query_vec, k);
        debug!(query, k, hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }
}

/// Join chunk texts with blank lines, in the order given.
pub fn format_docs(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Axis;

    impl Embedder for Axis {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("north") {
                        vec![0.0, 1.0]
                    } else {
                        vec![1.0, 0.0]
                    }
                })
                .collect())
        }
    }

    struct Wide;

    impl Embedder for Wide {
        fn model_name(&self) -> &str {
            "wide"
        }
        fn dims(&self) -> usize {
            3
        }
        fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    fn index() -> Arc<VectorIndex> {
        Arc::new(
            VectorIndex::from_parts(
                vec![vec![1.0, 0.0], vec![0.6, 0.8], vec![0.0, 1.0]],
                vec![Chunk::new("east"), Chunk::new("mostly north"), Chunk::new("north")],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_top_two_most_similar_first() {
        let r = Retriever::new(index(), Arc::new(Axis), 5).unwrap();
        let out = r.retrieve_k("go north", 2).unwrap();
        let texts: Vec<&str> = out.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "mostly north"]);
    }

    #[test]
    fn test_bound_k_caps_results() {
        let r = Retriever::new(index(), Arc::new(Axis), 1).unwrap();
        assert_eq!(r.retrieve("east").unwrap().len(), 1);
    }

    #[test]
    fn test_zero_k_rejected() {
        let err = Retriever::new(index(), Arc::new(Axis), 0).err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_provider_error() {
        let r = Retriever::new(index(), Arc::new(Wide), 2).unwrap();
        assert!(r.retrieve("x").unwrap_err().is_provider());
    }

    #[test]
    fn test_format_docs_keeps_order() {
        let chunks = vec![Chunk::new("first"), Chunk::new("second")];
        assert_eq!(format_docs(&chunks), "first\n\nsecond");
        assert_eq!(format_docs(&[]), "");
    }
}
