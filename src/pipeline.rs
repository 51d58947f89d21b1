//! The conversational RAG pipeline.
//!
//! One [`ConversationalRag`] per chat session. It starts unbound and becomes
//! ready once a retriever is attached, either handed in directly with
//! [`with_retriever`](ConversationalRag::with_retriever) or loaded from a
//! persisted index with [`attach`](ConversationalRag::attach). There is no
//! way back to unbound.
//!
//! Each [`ask`](ConversationalRag::ask) runs three steps in order:
//!
//! 1. rewrite the input into a standalone question using the history,
//! 2. retrieve the top-k chunks for that standalone question,
//! 3. answer the *original* input from the joined chunks.
//!
//! The pipeline keeps no per-call state; history is supplied by the caller.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use doc_portal_core::answer::{AnswerGenerator, NO_ANSWER};
use doc_portal_core::completion::Completer;
use doc_portal_core::embedding::Embedder;
use doc_portal_core::models::ChatMessage;
use doc_portal_core::retrieval::{format_docs, Retriever};
use doc_portal_core::rewrite::QueryRewriter;
use doc_portal_core::{Error, Result};

use crate::session::generate_session_id;
use crate::store;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Also render the history into the answer prompt.
    pub inject_history: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            inject_history: true,
        }
    }
}

pub struct ConversationalRag {
    session_id: String,
    embedder: Arc<dyn Embedder>,
    rewriter: QueryRewriter,
    answerer: AnswerGenerator,
    retriever: Option<Retriever>,
    options: PipelineOptions,
}

impl ConversationalRag {
    pub fn new(
        session_id: Option<String>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        options: PipelineOptions,
    ) -> Self {
        let session_id = session_id.unwrap_or_else(generate_session_id);
        info!(
            session_id = %session_id,
            model = completer.model_name(),
            "conversational pipeline initialized"
        );
        Self {
            session_id,
            embedder,
            rewriter: QueryRewriter::new(completer.clone()),
            answerer: AnswerGenerator::new(completer),
            retriever: None,
            options,
        }
    }

    /// Bind a retriever supplied by the caller.
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_ready(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn retriever(&self) -> Option<&Retriever> {
        self.retriever.as_ref()
    }

    /// Load the persisted index at `index_path` and bind a top-`k` retriever.
    ///
    /// Fails with [`Error::NotFound`] when no index exists there. On
    /// failure a previously attached retriever stays in place.
    pub fn attach(&mut self, index_path: &Path, k: usize) -> Result<&Retriever> {
        if !store::index_exists(index_path) {
            return Err(Error::NotFound {
                operation: "attach",
                path: index_path.to_path_buf(),
            });
        }
        let index = store::load_index(index_path, "attach")?;
        let vectors = index.len();
        let retriever = Retriever::new(Arc::new(index), self.embedder.clone(), k)?;

        info!(
            session_id = %self.session_id,
            index_path = %index_path.display(),
            vectors,
            k,
            "retriever attached"
        );
        Ok(self.retriever.insert(retriever))
    }

    /// Answer `input` given the prior turns in `chat_history`.
    ///
    /// Returns [`NO_ANSWER`] when the generator produces nothing.
    pub fn ask(&self, input: &str, chat_history: Option<&[ChatMessage]>) -> Result<String> {
        let retriever = self.retriever.as_ref().ok_or(Error::NotReady {
            operation: "ask",
            required: "attach",
        })?;
        let history = chat_history.unwrap_or(&[]);

        let standalone = self.rewriter.rewrite(input, history)?;
        let docs = retriever.retrieve(&standalone)?;
        let context = format_docs(&docs);

        let answer_history: &[ChatMessage] = if self.options.inject_history {
            history
        } else {
            &[]
        };
        let answer = self.answerer.generate(&context, input, answer_history)?;

        if answer.trim().is_empty() {
            warn!(
                session_id = %self.session_id,
                input,
                retrieved = docs.len(),
                "no answer generated"
            );
            return Ok(NO_ANSWER.to_string());
        }

        info!(
            session_id = %self.session_id,
            input,
            retrieved = docs.len(),
            answer_preview = %preview(&answer, 150),
            "question answered"
        );
        Ok(answer)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
