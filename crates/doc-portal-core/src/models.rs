//! Core data models shared by ingestion and the query path.

use serde::{Deserialize, Serialize};

/// Provenance metadata attached to a chunk (`source`, `row_id`, `page`, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A unit of document text plus its provenance metadata.
///
/// This is the atomic item stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style helper for attaching a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A chunk returned from similarity search with its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "Human",
            Role::Ai => "AI",
            Role::System => "System",
        }
    }
}

/// One prior message in a conversation, oldest first in any history slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// Render a history as `Role: text` lines, preserving chronological order.
pub fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_history_keeps_order() {
        let history = vec![
            ChatMessage::human("Who wrote the report?"),
            ChatMessage::ai("Jane Doe."),
            ChatMessage::human("When?"),
        ];
        assert_eq!(
            format_history(&history),
            "Human: Who wrote the report?\nAI: Jane Doe.\nHuman: When?"
        );
    }

    #[test]
    fn test_role_serde_names() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role":"ai","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::Ai);
        assert_eq!(
            serde_json::to_string(&ChatMessage::human("x")).unwrap(),
            r#"{"role":"human","content":"x"}"#
        );
    }

    #[test]
    fn test_chunk_metadata_defaults_to_empty() {
        let chunk: Chunk = serde_json::from_str(r#"{"text":"body"}"#).unwrap();
        assert!(chunk.metadata.is_empty());
        let chunk = Chunk::new("body").with_meta("source", "a.pdf");
        assert_eq!(chunk.metadata["source"], "a.pdf");
    }
}
