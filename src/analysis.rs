//! LLM-driven document metadata extraction.
//!
//! The model is asked for a single JSON object describing the document.
//! Replies wrapped in Markdown code fences are accepted. If the reply does
//! not parse, the model gets one chance to repair it before the analysis
//! fails with [`Error::Generation`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use doc_portal_core::completion::Completer;
use doc_portal_core::prompts::{render, PromptType};
use doc_portal_core::{Error, Result};

/// Page count as reported by the model: a number, or free text like "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageCount {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    #[serde(alias = "summary")]
    pub summary: Vec<String>,
    #[serde(alias = "title")]
    pub title: String,
    #[serde(alias = "author")]
    pub author: Vec<String>,
    #[serde(alias = "date_created")]
    pub date_created: String,
    #[serde(alias = "last_modified_date")]
    pub last_modified_date: String,
    #[serde(alias = "publisher")]
    pub publisher: String,
    #[serde(alias = "language")]
    pub language: String,
    #[serde(alias = "page_count")]
    pub page_count: PageCount,
    #[serde(alias = "sentiment")]
    pub sentiment: String,
}

const FORMAT_INSTRUCTIONS: &str = r#"The output must be a single JSON object with exactly these keys:
{
  "Summary": ["string", "..."],
  "Title": "string",
  "Author": ["string", "..."],
  "DateCreated": "string",
  "LastModifiedDate": "string",
  "Publisher": "string",
  "Language": "string",
  "PageCount": "integer or string",
  "Sentiment": "string"
}
Use "Not Available" for any value the document does not provide."#;

const REPAIR_PROMPT: &str = "\
The following output was supposed to be valid JSON matching the schema below \
but could not be parsed ({error}). Return ONLY the corrected JSON.

{format_instructions}

Output to fix:
{completion}";

pub struct DocumentAnalyzer {
    completer: Arc<dyn Completer>,
}

impl DocumentAnalyzer {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    pub fn prompt(&self, document_text: &str) -> String {
        render(
            PromptType::DocumentAnalysis.template(),
            &[
                ("format_instructions", FORMAT_INSTRUCTIONS),
                ("document_text", document_text),
            ],
        )
    }

    pub fn analyze(&self, document_text: &str) -> Result<DocumentMetadata> {
        let reply = self.complete(&self.prompt(document_text))?;
        let parse_error = match parse_metadata(&reply) {
            Ok(metadata) => return Ok(self.done(metadata)),
            Err(e) => e,
        };

        warn!(
            model = self.completer.model_name(),
            error = %parse_error,
            "analysis output did not parse, asking for a repair"
        );
        let repair = render(
            REPAIR_PROMPT,
            &[
                ("error", &parse_error.to_string()),
                ("format_instructions", FORMAT_INSTRUCTIONS),
                ("completion", &reply),
            ],
        );
        let repaired = self.complete(&repair)?;
        let metadata = parse_metadata(&repaired).map_err(|e| {
            Error::generation(
                "analysis",
                self.completer.model_name(),
                anyhow::Error::new(e).context("repaired output is still not valid metadata JSON"),
            )
        })?;
        Ok(self.done(metadata))
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.completer
            .complete(prompt)
            .map_err(|e| Error::generation("analysis", self.completer.model_name(), e))
    }

    fn done(&self, metadata: DocumentMetadata) -> DocumentMetadata {
        info!(
            model = self.completer.model_name(),
            title = %metadata.title,
            summary_points = metadata.summary.len(),
            "metadata extraction successful"
        );
        metadata
    }
}

fn parse_metadata(reply: &str) -> std::result::Result<DocumentMetadata, serde_json::Error> {
    serde_json::from_str(strip_code_fence(reply))
}

/// Remove a surrounding ```` ```json ... ``` ```` fence, if any.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
