//! Core data types shared across the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied extraction schema: field name mapped to a free-form type
/// hint (e.g. `"price": "number"`). Opaque to the pipeline; passed through to
/// the query context and the extraction prompt unchanged.
pub type ExtractionSchema = Map<String, Value>;

/// One extracted record, shaped like the schema. Fields the model could not
/// determine are `null`.
pub type Record = Map<String, Value>;

/// Request body for `POST /fetch` and the one-shot `query` command.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequest {
    /// Natural-language query to answer.
    pub query: String,
    /// Desired output schema for extracted records.
    pub output: ExtractionSchema,
    /// Maximum number of records to return (first N, no re-ranking).
    #[serde(default = "default_max_answers")]
    pub max_answers: usize,
}

fn default_max_answers() -> usize {
    50
}

/// A fetched web page reduced to plain text. Pages whose fetch failed or
/// produced no text never reach the pipeline.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub text: String,
}

/// A chunk selected by similarity ranking, paired with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    pub text: String,
    /// Dot product of the query vector and this chunk's vector.
    pub score: f32,
}

/// Terminal outcome of one pipeline run.
///
/// Every run produces exactly one of these, success or failure. On failure
/// `error` carries the message and `results` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub query: String,
    pub results: Vec<Record>,
    pub total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    /// An empty, successful record for `query`.
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            total_found: 0,
            error: None,
        }
    }
}

/// One event on the progress stream. A run emits any number of `log` events
/// followed by exactly one `result` event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Log { message: String },
    Result { data: ResultRecord },
}
