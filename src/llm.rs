//! Text-generation providers.
//!
//! Concrete implementations of the core [`Completer`] capability. Each
//! prompt is sent as a single user message; the reply text is returned
//! verbatim (possibly empty).
//!
//! | `provider` | Endpoint | Credential |
//! |------------|----------|------------|
//! | `openai` | `{url or https://api.openai.com/v1}/chat/completions` | `OPENAI_API_KEY` |
//! | `groq` | `{url or https://api.groq.com/openai/v1}/chat/completions` | `GROQ_API_KEY` |
//! | `ollama` | `{url or http://localhost:11434}/api/chat` | none |
//! | `disabled` | none, every call fails | none |

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::sync::Arc;
use tracing::info;

use doc_portal_core::completion::Completer;

use crate::config::LlmProviderConfig;
use crate::http;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const GROQ_URL: &str = "https://api.groq.com/openai/v1";
const OLLAMA_URL: &str = "http://localhost:11434";
const MAX_RETRIES: u32 = 3;

/// Instantiate the completer described by one `[llm.providers.<name>]` block.
pub fn create_completer(name: &str, config: &LlmProviderConfig) -> Result<Arc<dyn Completer>> {
    info!(
        name,
        provider = %config.provider,
        model = %config.model,
        temperature = config.temperature,
        max_tokens = config.max_tokens,
        "loading LLM"
    );
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(ChatCompletions::new(
            config,
            OPENAI_URL,
            "OPENAI_API_KEY",
            "OpenAI",
        )?)),
        "groq" => Ok(Arc::new(ChatCompletions::new(
            config,
            GROQ_URL,
            "GROQ_API_KEY",
            "Groq",
        )?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledCompleter)),
        other => bail!("Unsupported LLM provider: {}", other),
    }
}

pub struct DisabledCompleter;

impl Completer for DisabledCompleter {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("LLM provider is disabled; configure an [llm.providers.*] block")
    }
}

/// OpenAI-compatible `/chat/completions` client (OpenAI, Groq, gateways).
pub struct ChatCompletions {
    model: String,
    temperature: f32,
    max_tokens: u32,
    endpoint: String,
    api_key: String,
    label: &'static str,
    client: Client,
}

impl ChatCompletions {
    fn new(
        config: &LlmProviderConfig,
        default_url: &str,
        key_var: &str,
        label: &'static str,
    ) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .with_context(|| format!("{} environment variable not set", key_var))?;
        let base = config.url.as_deref().unwrap_or(default_url);
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            label,
            client: http::client(config.timeout_secs)?,
        })
    }
}

impl Completer for ChatCompletions {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            MAX_RETRIES,
            self.label,
        )?;
        parse_chat_completion(&json)
    }
}

fn parse_chat_completion(json: &serde_json::Value) -> Result<String> {
    let message = json
        .pointer("/choices/0/message")
        .context("Invalid chat completion: missing choices[0].message")?;
    // A null content (e.g. refusal or tool call) reads as an empty answer.
    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Ollama `/api/chat` client with streaming disabled.
pub struct OllamaChat {
    model: String,
    temperature: f32,
    max_tokens: u32,
    endpoint: String,
    client: Client,
}

impl OllamaChat {
    fn new(config: &LlmProviderConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(OLLAMA_URL);
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: format!("{}/api/chat", base.trim_end_matches('/')),
            client: http::client(config.timeout_secs)?,
        })
    }
}

impl Completer for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            None,
            &body,
            MAX_RETRIES,
            "Ollama",
        )?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .context("Invalid Ollama response: missing message.content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(provider: &str) -> LlmProviderConfig {
        LlmProviderConfig {
            provider: provider.to_string(),
            model: "m".to_string(),
            temperature: 0.2,
            max_tokens: 16,
            url: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_disabled_completer_errors() {
        let c = create_completer("off", &block("disabled")).unwrap();
        assert!(c.complete("hi").is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(create_completer("x", &block("google")).is_err());
    }

    #[test]
    fn test_parse_chat_completion() {
        let json = json!({"choices": [{"message": {"role": "assistant", "content": "42"}}]});
        assert_eq!(parse_chat_completion(&json).unwrap(), "42");

        let json = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        assert_eq!(parse_chat_completion(&json).unwrap(), "");

        assert!(parse_chat_completion(&json!({"choices": []})).is_err());
    }
}
