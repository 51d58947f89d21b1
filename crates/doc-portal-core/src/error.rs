//! Typed failures for ingestion and the conversational pipeline.
//!
//! Every variant names the operation that failed plus the identifier it was
//! working on, so callers can branch on the kind and still print something
//! useful. Provider implementations return `anyhow::Result`; the core wraps
//! those failures into [`Error::Provider`] or [`Error::Generation`].

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across both crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid setup, e.g. no seed data for a fresh index.
    #[error("configuration error in {operation}: {reason}")]
    Configuration {
        operation: &'static str,
        reason: String,
    },

    /// Operation invoked before the required state transition.
    #[error("{operation} called before {required}")]
    NotReady {
        operation: &'static str,
        required: &'static str,
    },

    /// A referenced persisted index does not exist.
    #[error("{operation}: no persisted index at {}", path.display())]
    NotFound {
        operation: &'static str,
        path: PathBuf,
    },

    /// An embedding or generation call failed or returned malformed output.
    #[error("{operation}: provider '{provider}' failed: {source:#}")]
    Provider {
        operation: &'static str,
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// The rewrite, answer, or analysis step failed to produce text.
    #[error("{stage}: generation with '{provider}' failed: {source:#}")]
    Generation {
        stage: &'static str,
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation}: I/O error on {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted file exists but cannot be decoded.
    #[error("{operation}: corrupt data in {}: {reason}", path.display())]
    Corrupt {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// Another writer holds the index directory.
    #[error("{operation}: index directory {} is locked by another writer", path.display())]
    Locked {
        operation: &'static str,
        path: PathBuf,
    },

    #[error("{operation}: JSON error: {source}")]
    Json {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn configuration(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            operation,
            reason: reason.into(),
        }
    }

    pub fn provider(
        operation: &'static str,
        provider: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::Provider {
            operation,
            provider: provider.into(),
            source: source.into(),
        }
    }

    pub fn generation(
        stage: &'static str,
        provider: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::Generation {
            stage,
            provider: provider.into(),
            source: source.into(),
        }
    }

    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// True for both embedding and generation failures.
    ///
    /// [`Error::Generation`] is the answer/rewrite-specific refinement of
    /// [`Error::Provider`].
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider { .. } | Error::Generation { .. })
    }
}
