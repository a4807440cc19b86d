//! Web search abstraction and the Google Custom Search implementation.
//!
//! [`SearchProvider`] is the port the pipeline talks to; [`GoogleSearch`]
//! calls the Custom Search JSON API and returns result URLs in ranking
//! order. No de-duplication beyond what the API returns.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::error::{ConfigError, SearchError};

/// Trait for web search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return up to `count` result URLs for `query`, in provider order.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, SearchError>;
}

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Search client for the Google Custom Search JSON API.
pub struct GoogleSearch {
    api_key: String,
    engine_id: String,
    timeout: Duration,
    base_url: String,
}

/// Response subset of the Custom Search API. `items` is omitted entirely
/// when a query has no results.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

impl GoogleSearch {
    /// Create a new Google search client.
    ///
    /// # Errors
    ///
    /// Returns an error if either credential is empty.
    pub fn new(
        config: &SearchConfig,
        api_key: &str,
        engine_id: &str,
    ) -> Result<Self, ConfigError> {
        if api_key.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "GOOGLE_API_KEY",
            });
        }
        if engine_id.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "GOOGLE_SEARCH_ENGINE_ID",
            });
        }

        Ok(Self {
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            base_url: GOOGLE_SEARCH_URL.to_string(),
        })
    }

    /// Override the API base URL (e.g. to point at a local stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, SearchError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let response = client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", &count.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        Ok(parsed.items.into_iter().map(|item| item.link).collect())
    }
}
