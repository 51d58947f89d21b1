//! Fixed instruction templates for the generation steps.
//!
//! Templates use `{name}` placeholders filled by [`render`]. Each step owns
//! exactly one template, looked up through [`PromptType`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptType {
    DocumentAnalysis,
    ContextualizeQuestion,
    ContextQa,
}

impl PromptType {
    pub fn template(&self) -> &'static str {
        match self {
            PromptType::DocumentAnalysis => DOCUMENT_ANALYSIS,
            PromptType::ContextualizeQuestion => CONTEXTUALIZE_QUESTION,
            PromptType::ContextQa => CONTEXT_QA,
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptType::DocumentAnalysis => "document_analysis",
            PromptType::ContextualizeQuestion => "contextualize_question",
            PromptType::ContextQa => "context_qa",
        };
        f.write_str(name)
    }
}

const CONTEXTUALIZE_QUESTION: &str = "\
Given a conversation history and the most recent user query, rewrite the query \
as a standalone question that makes sense without the history. Resolve pronouns \
and references using the history. Do NOT answer the question; only reformulate \
it if needed, otherwise return it as is.

Chat history:
{chat_history}

User query: {input}

Standalone question:";

const CONTEXT_QA: &str = "\
You are an assistant designed to answer questions using the provided context. \
Rely only on the retrieved information to form your response. If the answer is \
not found in the context, respond with \"I don't know.\" Keep your answer \
concise and no longer than three sentences.

Context:
{context}
{chat_history}
Question: {input}

Answer:";

const DOCUMENT_ANALYSIS: &str = "\
You are a highly capable assistant trained to analyze and summarize documents. \
Return ONLY valid JSON matching the exact schema below.

{format_instructions}

Analyze this document:
{document_text}";

/// Substitute `{name}` placeholders. Unknown placeholders are left intact.
///
/// Values are inserted in a single left-to-right pass, so braces inside a
/// value are never re-expanded.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match replaced {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
