//! # Document Portal Core
//!
//! Shared, I/O-free logic for Document Portal: the chunk and chat models,
//! dedup fingerprints, the in-memory vector index and its payload codec,
//! the provider capability traits, and the three query steps (rewrite,
//! retrieve, answer).
//!
//! This crate performs no filesystem or network access. Persistence,
//! locking, and concrete providers live in the `doc-portal` app crate.

pub mod answer;
pub mod chunk;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod models;
pub mod prompts;
pub mod retrieval;
pub mod rewrite;

pub use error::{Error, Result};
