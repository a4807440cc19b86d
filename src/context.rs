//! Relevant-context assembly: corpus, chunk, embed, rank, join.
//!
//! Turns the scraped pages into one retrieval corpus with per-URL provenance
//! markers, embeds the query and every chunk, and joins the top-ranked chunk
//! texts into the context string handed to the extractor.

use crate::chunk::chunk_words;
use crate::embedding::{EmbeddingClient, TaskType};
use crate::error::{EmbeddingError, PipelineError};
use crate::models::{ExtractionSchema, RankedChunk, ScrapedPage};
use crate::rank::rank_chunks;

/// Concatenate page texts into one corpus, preceding each page with a
/// provenance marker naming its URL.
pub fn build_corpus(pages: &[ScrapedPage]) -> String {
    let mut corpus = String::new();
    for page in pages {
        corpus.push_str(&format!(
            "\n\n--- Content from {} ---\n{}",
            page.url, page.text
        ));
    }
    corpus
}

/// The text embedded as the retrieval query: the user's query plus the
/// schema, so the vector captures the intended extraction targets.
pub fn query_context(query: &str, schema: &ExtractionSchema) -> String {
    let schema_json = serde_json::Value::Object(schema.clone());
    format!("Query: {}\nSchema: {}", query, schema_json)
}

/// Embed the query context and every chunk, then return the `top_k` most
/// similar chunks with their scores, most relevant first.
pub async fn retrieve_relevant_chunks(
    embedder: &dyn EmbeddingClient,
    query: &str,
    schema: &ExtractionSchema,
    chunks: &[String],
    top_k: usize,
) -> Result<Vec<RankedChunk>, PipelineError> {
    let context = query_context(query, schema);

    let query_vec = embedder
        .embed(&[context], TaskType::Query)
        .await?
        .into_iter()
        .next()
        .ok_or(EmbeddingError::CountMismatch { sent: 1, got: 0 })?;

    let chunk_vecs = embedder.embed(chunks, TaskType::Document).await?;

    let ranked = rank_chunks(&query_vec, &chunk_vecs, top_k)?;

    Ok(ranked
        .into_iter()
        .map(|(index, score)| RankedChunk {
            text: chunks[index].clone(),
            score,
        })
        .collect())
}

/// Produce the relevant-context string for one request.
///
/// Chunks the corpus at `chunk_size` words, ranks the chunks against the
/// query, and joins the `top_k` winners with a blank line. An empty corpus
/// short-circuits to an empty string without touching the embedder.
pub async fn assemble_context(
    embedder: &dyn EmbeddingClient,
    query: &str,
    schema: &ExtractionSchema,
    pages: &[ScrapedPage],
    chunk_size: usize,
    top_k: usize,
) -> Result<String, PipelineError> {
    let corpus = build_corpus(pages);
    let chunks = chunk_words(&corpus, chunk_size);

    if chunks.is_empty() {
        return Ok(String::new());
    }

    let relevant = retrieve_relevant_chunks(embedder, query, schema, &chunks, top_k).await?;

    Ok(relevant
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn page(url: &str, text: &str) -> ScrapedPage {
        ScrapedPage {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    fn schema() -> ExtractionSchema {
        let mut map = ExtractionSchema::new();
        map.insert("title".to_string(), serde_json::json!("string"));
        map
    }

    /// Embedder that maps texts containing "signal" near the query vector
    /// and everything else orthogonal to it.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingClient for KeywordEmbedder {
        async fn embed(
            &self,
            texts: &[String],
            task: TaskType,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|text| {
                    if task == TaskType::Query || text.contains("signal") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[test]
    fn test_build_corpus_markers() {
        let pages = vec![page("http://a.example", "alpha"), page("http://b.example", "beta")];
        let corpus = build_corpus(&pages);
        assert_eq!(
            corpus,
            "\n\n--- Content from http://a.example ---\nalpha\
             \n\n--- Content from http://b.example ---\nbeta"
        );
    }

    #[test]
    fn test_build_corpus_empty() {
        assert_eq!(build_corpus(&[]), "");
    }

    #[test]
    fn test_query_context_format() {
        let context = query_context("best sci-fi books", &schema());
        assert_eq!(
            context,
            "Query: best sci-fi books\nSchema: {\"title\":\"string\"}"
        );
    }

    #[tokio::test]
    async fn test_assemble_selects_relevant_chunks() {
        // Small chunks so the two pages land in different chunks.
        let pages = vec![
            page("http://a.example", "noise noise noise noise"),
            page("http://b.example", "signal signal signal signal"),
        ];
        let context = assemble_context(&KeywordEmbedder, "q", &schema(), &pages, 12, 1)
            .await
            .unwrap();
        assert!(context.contains("signal"));
        assert!(!context.contains("noise"));
    }

    #[tokio::test]
    async fn test_assemble_empty_pages() {
        let context = assemble_context(&KeywordEmbedder, "q", &schema(), &[], 500, 5)
            .await
            .unwrap();
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_score() {
        let chunks = vec![
            "plain text".to_string(),
            "the signal here".to_string(),
            "more filler".to_string(),
        ];
        let ranked = retrieve_relevant_chunks(&KeywordEmbedder, "q", &schema(), &chunks, 3)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].text, "the signal here");
        assert!(ranked[0].score > ranked[1].score);
    }
}
