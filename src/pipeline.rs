//! Pipeline orchestrator: search, fetch, assemble, extract.
//!
//! Runs one request through the stages in order, narrating progress into a
//! typed event channel as it goes. The run always terminates with exactly
//! one result event: early exits (no URLs, no usable pages, no extracted
//! records) are successes with empty results, and any stage failure is
//! demoted to a failed-but-well-formed result carrying the error message.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{Config, Credentials};
use crate::context::assemble_context;
use crate::embedding::{EmbeddingClient, GeminiEmbedder};
use crate::error::PipelineError;
use crate::extract::{Extractor, GeminiExtractor};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::models::{ExtractionSchema, ProgressEvent, ResultRecord, ScrapedPage};
use crate::search::{GoogleSearch, SearchProvider};

/// The request pipeline with its collaborators and tunables.
///
/// Stateless across runs; one instance serves all requests.
pub struct Pipeline {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    embedder: Arc<dyn EmbeddingClient>,
    extractor: Arc<dyn Extractor>,
    num_urls: usize,
    chunk_size: usize,
    top_k: usize,
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        embedder: Arc<dyn EmbeddingClient>,
        extractor: Arc<dyn Extractor>,
        config: &Config,
    ) -> Self {
        Self {
            search,
            fetcher,
            embedder,
            extractor,
            num_urls: config.search.num_urls,
            chunk_size: config.chunking.chunk_size,
            top_k: config.retrieval.top_k,
        }
    }

    /// Assemble a pipeline with the production collaborators: Google Custom
    /// Search, the HTTP page fetcher, and the Gemini embedding and
    /// extraction clients.
    pub fn from_config(config: &Config, credentials: &Credentials) -> anyhow::Result<Self> {
        let search = GoogleSearch::new(
            &config.search,
            &credentials.google_api_key,
            &credentials.google_search_engine_id,
        )?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let embedder = GeminiEmbedder::new(&config.embedding, &credentials.gemini_api_key)?;
        let extractor = GeminiExtractor::new(&config.extraction, &credentials.gemini_api_key)?;

        Ok(Self::new(
            Arc::new(search),
            Arc::new(fetcher),
            Arc::new(embedder),
            Arc::new(extractor),
            config,
        ))
    }

    /// Run one request to completion.
    ///
    /// Emits log events on `events` while working and finishes by sending
    /// exactly one result event. The returned record is the same one sent on
    /// the channel.
    pub async fn run(
        &self,
        query: &str,
        schema: &ExtractionSchema,
        max_answers: usize,
        events: &mpsc::Sender<ProgressEvent>,
    ) -> ResultRecord {
        let mut record = ResultRecord::empty(query);

        if let Err(err) = self
            .drive(query, schema, max_answers, &mut record, events)
            .await
        {
            self.log(events, format!("Error: {}", err)).await;
            record.results.clear();
            record.total_found = 0;
            record.error = Some(err.to_string());
        }

        let _ = events
            .send(ProgressEvent::Result {
                data: record.clone(),
            })
            .await;

        record
    }

    async fn drive(
        &self,
        query: &str,
        schema: &ExtractionSchema,
        max_answers: usize,
        record: &mut ResultRecord,
        events: &mpsc::Sender<ProgressEvent>,
    ) -> Result<(), PipelineError> {
        self.log(events, format!("Initiating web search for: '{}'", query))
            .await;
        self.log(events, "Querying Google Custom Search API...").await;
        let urls = self.search.search(query, self.num_urls).await?;
        self.log(
            events,
            format!("Search complete! Discovered {} relevant URLs", urls.len()),
        )
        .await;

        if urls.is_empty() {
            self.log(events, "No URLs found for the given query").await;
            return Ok(());
        }

        for (i, url) in urls.iter().take(3).enumerate() {
            let shown: String = url.chars().take(60).collect();
            let ellipsis = if url.chars().count() > 60 { "..." } else { "" };
            self.log(events, format!("   {}. {}{}", i + 1, shown, ellipsis))
                .await;
        }
        if urls.len() > 3 {
            self.log(events, format!("   ... and {} more URLs", urls.len() - 3))
                .await;
        }

        self.log(events, "Starting content extraction from web pages...")
            .await;
        self.log(events, format!("Fetching content from {} URLs...", urls.len()))
            .await;

        let mut pages = Vec::new();
        for url in &urls {
            let text = self.fetcher.fetch(url).await;
            if !text.is_empty() {
                pages.push(ScrapedPage {
                    url: url.clone(),
                    text,
                });
            }
        }

        self.log(
            events,
            format!(
                "Content extraction complete! Successfully processed {} pages",
                pages.len()
            ),
        )
        .await;

        if pages.is_empty() {
            self.log(events, "Failed to extract content from any URLs").await;
            return Ok(());
        }

        let total_chars: usize = pages.iter().map(|page| page.text.len()).sum();
        self.log(
            events,
            format!(
                "Total content extracted: {} characters",
                format_number(total_chars as u64)
            ),
        )
        .await;

        self.log(
            events,
            "Initializing RAG (Retrieval Augmented Generation) pipeline...",
        )
        .await;
        self.log(events, "Generating embeddings for query and content chunks...")
            .await;
        self.log(events, "Performing semantic similarity search...").await;

        let relevant = assemble_context(
            self.embedder.as_ref(),
            query,
            schema,
            &pages,
            self.chunk_size,
            self.top_k,
        )
        .await?;

        self.log(
            events,
            format!(
                "RAG processing complete! Retrieved {} characters of relevant content",
                format_number(relevant.len() as u64)
            ),
        )
        .await;

        self.log(
            events,
            "Sending content to Gemini AI for structured data extraction...",
        )
        .await;
        self.log(
            events,
            format!("Target schema: {:?}", schema.keys().collect::<Vec<_>>()),
        )
        .await;
        self.log(events, format!("Maximum answers requested: {}", max_answers))
            .await;

        let mut records = self
            .extractor
            .extract(query, schema, &relevant)
            .await
            .map_err(PipelineError::Extraction)?;

        if records.is_empty() {
            self.log(events, "No structured data could be extracted from the content")
                .await;
            return Ok(());
        }

        let found = records.len();
        if found > max_answers {
            records.truncate(max_answers);
            self.log(
                events,
                format!(
                    "Limited results to {} entries (found {} total)",
                    max_answers, found
                ),
            )
            .await;
        }

        let populated: usize = records
            .iter()
            .map(|record| record.values().filter(|value| !value.is_null()).count())
            .sum();
        let possible = records.len() * schema.len();

        record.total_found = records.len();
        record.results = records;

        self.log(
            events,
            format!(
                "Success! Extracted {} structured data entries",
                record.total_found
            ),
        )
        .await;
        self.log(
            events,
            format!("Data fields populated: {}/{}", populated, possible),
        )
        .await;

        Ok(())
    }

    async fn log(&self, events: &mpsc::Sender<ProgressEvent>, message: impl Into<String>) {
        // The receiver may be gone (client disconnected); the run still
        // completes so the result is well-defined.
        let _ = events
            .send(ProgressEvent::Log {
                message: message.into(),
            })
            .await;
    }
}

/// Format a number with thousands separators: `1234567` becomes `1,234,567`.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}
