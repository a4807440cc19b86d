//! Error taxonomy for the extraction pipeline.
//!
//! Construction-time problems (missing credentials, bad settings) are
//! [`ConfigError`]s and surface through `anyhow` at the binary boundary.
//! Per-request failures are typed per concern and collected into
//! [`PipelineError`], which the orchestrator converts into a
//! failed-but-well-formed result record. Nothing escapes the orchestrator.

use thiserror::Error;

/// Construction-time configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment credential was not set.
    #[error("{name} not found in environment")]
    MissingCredential { name: &'static str },
}

/// Failures from the web search client.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid search response: {0}")]
    Malformed(String),
}

/// Failures from the embedding client.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    Malformed(String),

    /// The provider returned a different number of vectors than texts sent.
    #[error("embedding count mismatch: sent {sent} texts, got {got} vectors")]
    CountMismatch { sent: usize, got: usize },

    /// Normalizing a zero vector is undefined.
    #[error("embedding at index {index} has zero norm")]
    ZeroNorm { index: usize },
}

/// Failures from similarity ranking.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error(
        "dimension mismatch: query has {query} dims, chunk {index} has {chunk}"
    )]
    DimensionMismatch {
        query: usize,
        chunk: usize,
        index: usize,
    },
}

/// Any per-request failure the orchestrator demotes to a failed result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error("extraction failed: {0}")]
    Extraction(#[source] anyhow::Error),
}
