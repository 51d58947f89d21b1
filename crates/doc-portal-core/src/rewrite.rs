//! History-aware query rewriting.
//!
//! Turns a follow-up such as "and who published it?" into a standalone
//! question using the prior turns. The rewrite only steers retrieval; the
//! answer step still sees the user's original wording.

use std::sync::Arc;

use tracing::debug;

use crate::completion::Completer;
use crate::error::{Error, Result};
use crate::models::{format_history, ChatMessage};
use crate::prompts::{render, PromptType};

pub struct QueryRewriter {
    completer: Arc<dyn Completer>,
}

impl QueryRewriter {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Build the contextualize prompt for `input` and `history`.
    pub fn prompt(&self, input: &str, history: &[ChatMessage]) -> String {
        render(
            PromptType::ContextualizeQuestion.template(),
            &[
                ("chat_history", &format_history(history)),
                ("input", input),
            ],
        )
    }

    /// Rewrite `input` into a standalone question.
    ///
    /// With no history there is nothing to resolve, so `input` is returned
    /// as-is without a provider call. A blank rewrite also falls back to
    /// `input`.
    pub fn rewrite(&self, input: &str, history: &[ChatMessage]) -> Result<String> {
        if history.is_empty() {
            return Ok(input.to_string());
        }

        let prompt = self.prompt(input, history);
        let rewritten = self
            .completer
            .complete(&prompt)
            .map_err(|e| Error::generation("rewrite", self.completer.model_name(), e))?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            debug!(input, "rewrite returned blank text, using original input");
            return Ok(input.to_string());
        }
        debug!(input, standalone = rewritten, "question rewritten");
        Ok(rewritten.to_string())
    }
}
