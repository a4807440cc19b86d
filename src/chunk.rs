//! Fixed-size word-count text chunker.
//!
//! Splits a corpus into non-overlapping chunks of `chunk_size` whitespace
//! delimited words. The last chunk may be shorter. No sentence or token
//! awareness; chunking the same corpus twice yields identical output.

/// Split `text` into chunks of `chunk_size` words.
///
/// For a corpus of W words this yields ⌈W/N⌉ chunks, each exactly N words
/// except possibly the last. An empty (or all-whitespace) corpus yields no
/// chunks, and `chunk_size == 0` yields no chunks rather than looping.
pub fn chunk_words(text: &str, chunk_size: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_size)
        .map(|window| window.join(" "))
        .collect()
}
