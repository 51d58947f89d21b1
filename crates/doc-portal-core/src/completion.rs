//! Text-generation capability trait.
//!
//! The rewrite, answer, and analysis steps only ever need "given a prompt,
//! return text". Concrete chat providers live in the app crate.

/// Capability: given a prompt, return text.
pub trait Completer: Send + Sync {
    /// Provider/model identifier used in logs and error messages.
    fn model_name(&self) -> &str;
    /// Run one completion. Blocks until the provider answers.
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
