//! TOML configuration.
//!
//! Everything a run needs (index location, chunk size, retrieval `k`,
//! provider settings, session folders) is read once by [`load_config`] and
//! then passed explicitly into constructors.
//!
//! ```toml
//! [index]
//! dir = "./data/faiss_index"
//!
//! [retrieval]
//! k = 5
//! inject_history = true
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [llm]
//! active = "groq"
//!
//! [llm.providers.groq]
//! provider = "groq"
//! model = "llama-3.1-8b-instant"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    /// Render prior turns into the answer prompt as well as the rewrite.
    #[serde(default = "default_true")]
    pub inject_history: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            inject_history: true,
        }
    }
}

fn default_k() -> usize {
    doc_portal_core::retrieval::DEFAULT_K
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama host, OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Named generation providers plus the one to use.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub providers: BTreeMap<String, LlmProviderConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmProviderConfig {
    /// Backend kind: `openai`, `groq`, `ollama`, or `disabled`.
    pub provider: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_llm_max_tokens() -> u32 {
    2048
}
fn default_llm_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    /// Resolve the provider block to use.
    ///
    /// `override_name` (the CLI `--llm` flag) wins over `llm.active`. With
    /// neither set and exactly one block configured, that block is used.
    pub fn resolve(&self, override_name: Option<&str>) -> Result<(&str, &LlmProviderConfig)> {
        let name = match override_name.or(self.active.as_deref()) {
            Some(name) => name,
            None if self.providers.len() == 1 => {
                return self
                    .providers
                    .iter()
                    .next()
                    .map(|(k, v)| (k.as_str(), v))
                    .context("no llm providers configured");
            }
            None => bail!("llm.active must name one of the [llm.providers.*] blocks"),
        };
        self.providers
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                format!(
                    "LLM provider '{}' not found in config (available: {})",
                    name,
                    self.providers.keys().cloned().collect::<Vec<_>>().join(", ")
                )
            })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    #[serde(default = "default_sessions_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_keep_latest")]
    pub keep_latest: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: default_sessions_dir(),
            keep_latest: default_keep_latest(),
        }
    }
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("./data/sessions")
}
fn default_keep_latest() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }
    if config.retrieval.k == 0 {
        bail!("retrieval.k must be >= 1");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    for (name, block) in &config.llm.providers {
        match block.provider.as_str() {
            "disabled" | "openai" | "groq" | "ollama" => {}
            other => bail!(
                "llm.providers.{}: unknown provider '{}'. Must be openai, groq, ollama, or disabled.",
                name,
                other
            ),
        }
        if !(0.0..=2.0).contains(&block.temperature) {
            bail!("llm.providers.{}.temperature must be in [0.0, 2.0]", name);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[index]
dir = "./data/idx"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let c = parse_config(MINIMAL).unwrap();
        assert_eq!(c.index.dir, PathBuf::from("./data/idx"));
        assert_eq!(c.chunking.max_tokens, 700);
        assert_eq!(c.retrieval.k, 5);
        assert!(c.retrieval.inject_history);
        assert!(!c.embedding.is_enabled());
        assert_eq!(c.sessions.keep_latest, 3);
    }

    #[test]
    fn test_enabled_embedding_requires_model_and_dims() {
        let text = format!("{}\n[embedding]\nprovider = \"openai\"\n", MINIMAL);
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_zero_k_rejected() {
        let text = format!("{}\n[retrieval]\nk = 0\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn test_llm_resolution() {
        let text = format!(
            r#"{}
[llm]
active = "groq"

[llm.providers.groq]
provider = "groq"
model = "llama-3.1-8b-instant"

[llm.providers.local]
provider = "ollama"
model = "llama3"
temperature = 0.0
"#,
            MINIMAL
        );
        let c = parse_config(&text).unwrap();
        let (name, block) = c.llm.resolve(None).unwrap();
        assert_eq!(name, "groq");
        assert_eq!(block.max_tokens, 2048);
        assert!((block.temperature - 0.2).abs() < f32::EPSILON);

        let (name, block) = c.llm.resolve(Some("local")).unwrap();
        assert_eq!(name, "local");
        assert_eq!(block.provider, "ollama");

        let err = c.llm.resolve(Some("google")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unknown_llm_provider_rejected() {
        let text = format!(
            "{}\n[llm.providers.x]\nprovider = \"carrier-pigeon\"\nmodel = \"m\"\n",
            MINIMAL
        );
        assert!(parse_config(&text).is_err());
    }
}
