//! End-to-end pipeline tests with mock providers.
//!
//! These exercise the orchestrator's contract: every run emits any number of
//! log events followed by exactly one result event, early exits are empty
//! successes, and stage failures become failed-but-well-formed records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use websift::config::Config;
use websift::embedding::{EmbeddingClient, TaskType};
use websift::error::{EmbeddingError, SearchError};
use websift::extract::Extractor;
use websift::fetch::PageFetcher;
use websift::models::{ExtractionSchema, ProgressEvent, Record, ResultRecord};
use websift::pipeline::Pipeline;
use websift::search::SearchProvider;

struct MockSearch {
    urls: Vec<String>,
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, _query: &str, count: usize) -> Result<Vec<String>, SearchError> {
        Ok(self.urls.iter().take(count).cloned().collect())
    }
}

struct FailingSearch;

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, _query: &str, _count: usize) -> Result<Vec<String>, SearchError> {
        Err(SearchError::Api {
            status: 429,
            body: "quota exhausted".to_string(),
        })
    }
}

struct MockFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> String {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}

/// Query and texts containing "relevant" map to one axis, everything else to
/// the other, so ranking is deterministic.
struct MockEmbedder;

#[async_trait]
impl EmbeddingClient for MockEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        task: TaskType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                if task == TaskType::Query || text.contains("relevant") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
}

struct MockExtractor {
    records: Vec<Record>,
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        _query: &str,
        _schema: &ExtractionSchema,
        _content: &str,
    ) -> anyhow::Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

struct FailingExtractor;

#[async_trait]
impl Extractor for FailingExtractor {
    async fn extract(
        &self,
        _query: &str,
        _schema: &ExtractionSchema,
        _content: &str,
    ) -> anyhow::Result<Vec<Record>> {
        anyhow::bail!("model unavailable")
    }
}

fn schema() -> ExtractionSchema {
    let mut map = ExtractionSchema::new();
    map.insert("name".to_string(), json!("string"));
    map
}

fn record(name: &str) -> Record {
    let mut map = Record::new();
    map.insert("name".to_string(), json!(name));
    map
}

fn pipeline_with(
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
) -> Pipeline {
    let config = Config::default();
    Pipeline::new(search, fetcher, Arc::new(MockEmbedder), extractor, &config)
}

/// Run the pipeline and collect the full event stream alongside the record.
async fn run_collecting(
    pipeline: &Pipeline,
    query: &str,
    max_answers: usize,
) -> (ResultRecord, Vec<ProgressEvent>) {
    let (tx, mut rx) = mpsc::channel(64);
    let record = pipeline.run(query, &schema(), max_answers, &tx).await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (record, events)
}

fn terminal_results(events: &[ProgressEvent]) -> Vec<&ResultRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Result { data } => Some(data),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_happy_path_extracts_records() {
    let mut pages = HashMap::new();
    pages.insert(
        "http://a.example".to_string(),
        "relevant content about widgets".to_string(),
    );
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec!["http://a.example".to_string()],
        }),
        Arc::new(MockFetcher { pages }),
        Arc::new(MockExtractor {
            records: vec![record("widget-a"), record("widget-b")],
        }),
    );

    let (result, events) = run_collecting(&pipeline, "widgets", 50).await;

    assert!(result.error.is_none());
    assert_eq!(result.total_found, 2);
    assert_eq!(result.results[0]["name"], "widget-a");

    let terminals = terminal_results(&events);
    assert_eq!(terminals.len(), 1, "exactly one result event");
    assert_eq!(terminals[0].total_found, 2);
    assert!(matches!(events.last(), Some(ProgressEvent::Result { .. })));
}

#[tokio::test]
async fn test_no_urls_is_empty_success() {
    let pipeline = pipeline_with(
        Arc::new(MockSearch { urls: vec![] }),
        Arc::new(MockFetcher {
            pages: HashMap::new(),
        }),
        Arc::new(MockExtractor { records: vec![] }),
    );

    let (result, events) = run_collecting(&pipeline, "nothing", 50).await;

    assert!(result.error.is_none());
    assert!(result.results.is_empty());
    assert_eq!(result.total_found, 0);
    assert_eq!(terminal_results(&events).len(), 1);
}

#[tokio::test]
async fn test_all_fetches_failing_is_empty_success() {
    // Search returns URLs but no page yields text.
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec![
                "http://a.example".to_string(),
                "http://b.example".to_string(),
            ],
        }),
        Arc::new(MockFetcher {
            pages: HashMap::new(),
        }),
        Arc::new(MockExtractor {
            records: vec![record("never")],
        }),
    );

    let (result, events) = run_collecting(&pipeline, "q", 50).await;

    assert!(result.error.is_none());
    assert!(result.results.is_empty());
    assert_eq!(terminal_results(&events).len(), 1);
}

#[tokio::test]
async fn test_max_answers_truncates() {
    let mut pages = HashMap::new();
    pages.insert("http://a.example".to_string(), "relevant text".to_string());
    let records: Vec<Record> = (0..60).map(|i| record(&format!("item-{}", i))).collect();
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec!["http://a.example".to_string()],
        }),
        Arc::new(MockFetcher { pages }),
        Arc::new(MockExtractor { records }),
    );

    let (result, _) = run_collecting(&pipeline, "q", 50).await;

    assert_eq!(result.total_found, 50);
    assert_eq!(result.results.len(), 50);
    // Truncation keeps the first N in extraction order.
    assert_eq!(result.results[0]["name"], "item-0");
    assert_eq!(result.results[49]["name"], "item-49");
}

#[tokio::test]
async fn test_search_failure_yields_error_record() {
    let pipeline = pipeline_with(
        Arc::new(FailingSearch),
        Arc::new(MockFetcher {
            pages: HashMap::new(),
        }),
        Arc::new(MockExtractor { records: vec![] }),
    );

    let (result, events) = run_collecting(&pipeline, "q", 50).await;

    let error = result.error.as_deref().unwrap();
    assert!(error.contains("429"), "error was: {}", error);
    assert!(result.results.is_empty());
    assert_eq!(result.total_found, 0);

    // Still exactly one terminal event, carrying the same failure.
    let terminals = terminal_results(&events);
    assert_eq!(terminals.len(), 1);
    assert!(terminals[0].error.is_some());
}

#[tokio::test]
async fn test_extractor_failure_yields_error_record() {
    let mut pages = HashMap::new();
    pages.insert("http://a.example".to_string(), "relevant text".to_string());
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec!["http://a.example".to_string()],
        }),
        Arc::new(MockFetcher { pages }),
        Arc::new(FailingExtractor),
    );

    let (result, events) = run_collecting(&pipeline, "q", 50).await;

    let error = result.error.as_deref().unwrap();
    assert!(error.contains("extraction failed"), "error was: {}", error);
    assert_eq!(terminal_results(&events).len(), 1);
}

#[tokio::test]
async fn test_extractor_empty_is_empty_success() {
    let mut pages = HashMap::new();
    pages.insert("http://a.example".to_string(), "relevant text".to_string());
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec!["http://a.example".to_string()],
        }),
        Arc::new(MockFetcher { pages }),
        Arc::new(MockExtractor { records: vec![] }),
    );

    let (result, _) = run_collecting(&pipeline, "q", 50).await;

    assert!(result.error.is_none());
    assert!(result.results.is_empty());
    assert_eq!(result.total_found, 0);
}

#[tokio::test]
async fn test_run_survives_dropped_receiver() {
    let mut pages = HashMap::new();
    pages.insert("http://a.example".to_string(), "relevant text".to_string());
    let pipeline = pipeline_with(
        Arc::new(MockSearch {
            urls: vec!["http://a.example".to_string()],
        }),
        Arc::new(MockFetcher { pages }),
        Arc::new(MockExtractor {
            records: vec![record("x")],
        }),
    );

    let (tx, rx) = mpsc::channel(64);
    drop(rx);

    // No listener; the run must still complete and return the record.
    let result = pipeline.run("q", &schema(), 50, &tx).await;
    assert!(result.error.is_none());
    assert_eq!(result.total_found, 1);
}
