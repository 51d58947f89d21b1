//! Deterministic stand-ins for the embedding and generation providers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use doc_portal_core::completion::Completer;
use doc_portal_core::embedding::Embedder;
use doc_portal_core::models::Chunk;

const VOCAB: &[&str] = &["rust", "python", "docker", "invoice", "publisher"];

/// Embeds text as keyword counts over a tiny vocabulary.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub texts: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }
    fn dims(&self) -> usize {
        VOCAB.len() + 1
    }
    fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCAB
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect();
    v.push(0.01);
    v
}

/// Always fails.
pub struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }
    fn dims(&self) -> usize {
        3
    }
    fn embed_texts(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("connection refused")
    }
}

/// Records every prompt and replies by prompt kind.
pub struct ScriptedLlm {
    pub rewrite: String,
    pub answer: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(rewrite: &str, answer: &str) -> Self {
        Self {
            rewrite: rewrite.to_string(),
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every answer request.
    pub fn failing_answers(rewrite: &str) -> Self {
        Self {
            rewrite: rewrite.to_string(),
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Completer for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }
    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("Standalone question:") {
            return Ok(self.rewrite.clone());
        }
        match &self.answer {
            Some(answer) => Ok(answer.clone()),
            None => anyhow::bail!("rate limited"),
        }
    }
}

pub fn doc_chunk(source: &str, row: usize, text: &str) -> Chunk {
    Chunk::new(text)
        .with_meta("source", source)
        .with_meta("row_id", row)
        .with_meta("file_path", format!("/uploads/{}", source))
}

pub fn corpus() -> Vec<Chunk> {
    vec![
        doc_chunk("guide.md", 0, "Rust ownership rules and the rust borrow checker."),
        doc_chunk("guide.md", 1, "Python notebooks for data work."),
        doc_chunk("ops.txt", 0, "Docker images are rebuilt nightly."),
        doc_chunk("billing.pdf", 0, "Every invoice is issued by the publisher Acme Press."),
    ]
}
