//! # Document Portal
//!
//! Upload documents, index them once, and ask questions about them in a
//! multi-turn conversation.
//!
//! The library is split in two layers. `doc_portal_core` holds the pure
//! pieces (chunk model, fingerprints, vector index, prompt steps, typed
//! errors). This crate adds everything that touches the outside world:
//! configuration, HTTP providers, persistence, file extraction, and the
//! two stateful services.
//!
//! ## Architecture
//!
//! ```text
//! files ──▶ extract ──▶ loader ──▶ IngestionManager ──▶ index dir
//!                                   (fingerprint +      index.bin
//!                                    ledger dedup)      ingested_meta.json
//!                                                           │
//!                        question + history                 ▼
//!                              │                  ConversationalRag
//!                              └──────────────▶ rewrite ▶ retrieve ▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! portal ingest report.pdf notes.md
//! portal ask "What does the report conclude?"
//! portal chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama) |
//! | [`llm`] | Generation providers (OpenAI, Groq, Ollama) |
//! | [`http`] | Shared blocking HTTP client with retries |
//! | [`extract`] | PDF / DOCX / text extraction |
//! | [`loader`] | Files to metadata-tagged chunks |
//! | [`store`] | Index file layout, atomic writes, writer lock |
//! | [`ledger`] | Persisted set of ingested fingerprints |
//! | [`ingest`] | Idempotent index creation and appends |
//! | [`pipeline`] | Conversational retrieval-augmented answering |
//! | [`session`] | Per-session upload folders |
//! | [`analysis`] | LLM document metadata extraction |

pub mod analysis;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod ledger;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod session;
pub mod store;

pub use doc_portal_core::{Error, Result};
