//! Grounded answer generation.

use std::sync::Arc;

use crate::completion::Completer;
use crate::error::{Error, Result};
use crate::models::{format_history, ChatMessage};
use crate::prompts::{render, PromptType};

/// Returned instead of an empty generation.
pub const NO_ANSWER: &str = "no answer generated.";

pub struct AnswerGenerator {
    completer: Arc<dyn Completer>,
}

impl AnswerGenerator {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    pub fn prompt(&self, context: &str, question: &str, history: &[ChatMessage]) -> String {
        let history_block = if history.is_empty() {
            String::new()
        } else {
            format!("\nChat history:\n{}\n", format_history(history))
        };
        render(
            PromptType::ContextQa.template(),
            &[
                ("context", context),
                ("chat_history", &history_block),
                ("input", question),
            ],
        )
    }

    /// Answer `question` using only `context`.
    ///
    /// No retries; a provider failure surfaces as [`Error::Generation`].
    /// The raw completion is returned, including an empty one.
    pub fn generate(
        &self,
        context: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        let prompt = self.prompt(context, question, history);
        self.completer
            .complete(&prompt)
            .map_err(|e| Error::generation("answer", self.completer.model_name(), e))
    }
}
