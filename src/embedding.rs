//! Embedding client abstraction and the Gemini implementation.
//!
//! Defines the [`EmbeddingClient`] trait plus [`GeminiEmbedder`], which calls
//! the Gemini `batchEmbedContents` endpoint and returns one L2-normalized
//! vector per input text, in input order. Each call is a single attempt; the
//! orchestrator reports failures rather than retrying.
//!
//! Also provides [`l2_normalize`], the vector helper the embedder applies to
//! every returned vector so that downstream cosine similarity reduces to a
//! dot product.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::{ConfigError, EmbeddingError};

/// How the remote model should treat the text being embedded. Queries and
/// documents are embedded differently for retrieval.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskType {
    Query,
    Document,
}

impl TaskType {
    /// The wire name the Gemini API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Query => "RETRIEVAL_QUERY",
            TaskType::Document => "RETRIEVAL_DOCUMENT",
        }
    }
}

/// Trait for embedding backends.
///
/// Implementations return one vector per input text, in input order, already
/// L2-normalized.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts for the given task type.
    async fn embed(
        &self,
        texts: &[String],
        task: TaskType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Divide a vector by its Euclidean norm.
///
/// Returns `None` when the norm is (numerically) zero, since normalizing a
/// zero vector is undefined.
pub fn l2_normalize(vector: &[f32]) -> Option<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return None;
    }
    Some(vector.iter().map(|x| x / norm).collect())
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Embedding client using the Gemini `batchEmbedContents` API.
///
/// Sends the whole batch in one request with the configured task type and
/// output dimensionality, then normalizes each returned vector.
pub struct GeminiEmbedder {
    api_key: String,
    model: String,
    dims: usize,
    timeout: Duration,
    base_url: String,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedding client.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_key` is empty.
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self, ConfigError> {
        if api_key.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "GEMINI_API_KEY",
            });
        }

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dims: config.dims,
            timeout: Duration::from_secs(config.timeout_secs),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (e.g. to point at a local stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        task: TaskType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task.as_str(),
                    "outputDimensionality": self.dims,
                })
            })
            .collect();

        let body = serde_json::json!({ "requests": requests });

        let response = client
            .post(format!(
                "{}/models/{}:batchEmbedContents?key={}",
                self.base_url, self.model, self.api_key
            ))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response.json().await?;
        let raw = parse_batch_response(&json)?;

        if raw.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                sent: texts.len(),
                got: raw.len(),
            });
        }

        raw.into_iter()
            .enumerate()
            .map(|(index, vector)| l2_normalize(&vector).ok_or(EmbeddingError::ZeroNorm { index }))
            .collect()
    }
}

/// Parse the `batchEmbedContents` response JSON.
///
/// Extracts the `embeddings[].values` arrays and returns them in order.
fn parse_batch_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::Malformed("missing embeddings array".to_string()))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for item in embeddings {
        let values = item
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbeddingError::Malformed("missing values array".to_string()))?;

        let vector: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        result.push(vector);
    }

    Ok(result)
}
