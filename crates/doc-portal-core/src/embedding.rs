//! Embedding capability trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for vector encoding and similarity computation.
//!
//! Concrete providers (OpenAI, Ollama, disabled) live in the `doc-portal`
//! app crate; tests plug in deterministic stubs.

use crate::error::{Error, Result};

/// Capability: given text, return a vector.
///
/// Calls block until the provider answers. Implementations must return one
/// vector per input, in input order.
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Embed `texts` in batches of `batch_size`, preserving input order.
///
/// Fails with [`Error::Provider`] when the provider errors or returns a
/// different number of vectors than requested, or vectors of inconsistent
/// dimensionality.
pub fn embed_batched(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
    operation: &'static str,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        let vectors = embedder
            .embed_texts(batch)
            .map_err(|e| Error::provider(operation, embedder.model_name(), e))?;
        if vectors.len() != batch.len() {
            return Err(Error::provider(
                operation,
                embedder.model_name(),
                anyhow::anyhow!(
                    "expected {} embeddings, provider returned {}",
                    batch.len(),
                    vectors.len()
                ),
            ));
        }
        out.extend(vectors);
    }

    if let Some(first) = out.first() {
        let dims = first.len();
        if dims == 0 || out.iter().any(|v| v.len() != dims) {
            return Err(Error::provider(
                operation,
                embedder.model_name(),
                anyhow::anyhow!("provider returned empty or mixed-length vectors"),
            ));
        }
    }

    Ok(out)
}

/// Embed a single query text.
pub fn embed_query(embedder: &dyn Embedder, text: &str, operation: &'static str) -> Result<Vec<f32>> {
    embed_batched(embedder, &[text.to_string()], 1, operation)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::provider(
                operation,
                embedder.model_name(),
                anyhow::anyhow!("empty embedding response"),
            )
        })
}

/// Encode a float vector as little-endian `f32` bytes.
///
/// ```rust
/// use doc_portal_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes back into a vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-magnitude operand.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
