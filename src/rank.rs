//! Similarity ranking over embedding vectors.
//!
//! All vectors here are L2-normalized by the embedder, so cosine similarity
//! is just the dot product. Selection is top-k by descending score with ties
//! broken by original chunk order.

use crate::error::RankingError;

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Score every chunk vector against the query vector and return the top
/// `top_k` as `(chunk_index, score)` pairs, descending by score.
///
/// Fewer than `top_k` chunks returns all of them, still sorted. Equal scores
/// keep their original chunk order (the sort is stable).
///
/// # Errors
///
/// Returns an error if any chunk vector's dimensionality differs from the
/// query's.
pub fn rank_chunks(
    query: &[f32],
    chunks: &[Vec<f32>],
    top_k: usize,
) -> Result<Vec<(usize, f32)>, RankingError> {
    let mut scored = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.len() != query.len() {
            return Err(RankingError::DimensionMismatch {
                query: query.len(),
                chunk: chunk.len(),
                index,
            });
        }
        scored.push((index, dot(query, chunk)));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored)
}
