//! Structured data extraction via the Gemini `generateContent` API.
//!
//! [`Extractor`] is the port the pipeline talks to. [`GeminiExtractor`]
//! builds the data-extraction prompt, calls the model with a minimal
//! thinking budget, strips Markdown code fences from the reply, and parses
//! a JSON array of schema-shaped records. A lone JSON object is wrapped
//! into a one-element array. Unusable model output is not an error: the
//! extractor logs it and returns an empty list.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::error::ConfigError;
use crate::models::{ExtractionSchema, Record};

/// Trait for structured extraction backends.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract schema-shaped records from `content` for `query`.
    ///
    /// An empty list means "nothing found", which is a successful outcome.
    async fn extract(
        &self,
        query: &str,
        schema: &ExtractionSchema,
        content: &str,
    ) -> Result<Vec<Record>>;
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Extraction client using the Gemini `generateContent` API.
pub struct GeminiExtractor {
    api_key: String,
    model: String,
    thinking_budget: u32,
    timeout: Duration,
    base_url: String,
}

impl GeminiExtractor {
    /// Create a new Gemini extraction client.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_key` is empty.
    pub fn new(config: &ExtractionConfig, api_key: &str) -> Result<Self, ConfigError> {
        if api_key.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "GEMINI_API_KEY",
            });
        }

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            thinking_budget: config.thinking_budget,
            timeout: Duration::from_secs(config.timeout_secs),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (e.g. to point at a local stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "thinkingConfig": { "thinkingBudget": self.thinking_budget }
            }
        });

        let response = client
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            ))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        let text = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidate text"))?;

        Ok(text.to_string())
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(
        &self,
        query: &str,
        schema: &ExtractionSchema,
        content: &str,
    ) -> Result<Vec<Record>> {
        let prompt = build_prompt(query, schema, content);

        let raw = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "extraction call failed, returning no records");
                return Ok(Vec::new());
            }
        };

        match parse_records(&raw) {
            Some(records) => Ok(records),
            None => {
                tracing::warn!(response = %raw, "unparseable extraction output, returning no records");
                Ok(Vec::new())
            }
        }
    }
}

/// Build the data-extraction prompt for the model.
pub fn build_prompt(query: &str, schema: &ExtractionSchema, content: &str) -> String {
    let schema_json = serde_json::to_string_pretty(&Value::Object(schema.clone()))
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a data extraction expert. Extract structured information from the provided \
         content based on the user's query and desired schema.\n\
         \n\
         User Query: {query}\n\
         Desired Schema: {schema_json}\n\
         \n\
         Relevant Content:\n\
         {content}\n\
         \n\
         Instructions:\n\
         1. Look through the content and find information that matches the user's query\n\
         2. Extract data that fits the requested schema fields\n\
         3. If you find multiple relevant items, return them as an array\n\
         4. If a field cannot be determined from the content, use null\n\
         5. For numbers, extract actual numeric values (not strings)\n\
         6. For strings, extract the actual text content\n\
         \n\
         Return a JSON array of objects that match the schema. Each object should represent \
         one relevant item found in the content.\n\
         Return only the JSON array, no other text."
    )
}

/// Strip a surrounding ```json code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    trimmed.trim()
}

/// Parse the model reply into records.
///
/// Accepts a JSON array of objects or a lone object (wrapped into a
/// one-element array). Anything else returns `None`.
fn parse_records(raw: &str) -> Option<Vec<Record>> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned).ok()?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => Some(vec![map]),
        _ => None,
    }
}
