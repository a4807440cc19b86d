//! # websift
//!
//! Retrieval-augmented structured data extraction from the web.
//!
//! websift turns a natural-language query plus a desired output schema into
//! structured records: it searches the web, scrapes the result pages, ranks
//! the scraped content against the query with embeddings, and hands the most
//! relevant slices to an LLM for schema-shaped extraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌───────┐   ┌─────────────┐   ┌─────────┐
//! │ Search  │──▶│ Fetch │──▶│ Chunk+Embed │──▶│ Extract │
//! │ Google  │   │ HTML  │   │ +Rank (RAG) │   │ Gemini  │
//! └────────┘   └───────┘   └─────────────┘   └────┬────┘
//!                                                 │
//!                             ┌───────────────────┤
//!                             ▼                   ▼
//!                        ┌──────────┐       ┌──────────┐
//!                        │   CLI    │       │   HTTP   │
//!                        │ (query)  │       │  (SSE)   │
//!                        └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! websift query "best mirrorless cameras 2025" \
//!     --output '{"model": "string", "price": "number"}'
//! websift serve                 # start HTTP server with SSE streaming
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`models`] | Core data types and progress events |
//! | [`search`] | Web search (Google Custom Search) |
//! | [`fetch`] | Page fetching and HTML-to-text reduction |
//! | [`chunk`] | Word-window text chunking |
//! | [`embedding`] | Embedding client abstraction (Gemini) |
//! | [`rank`] | Similarity ranking over normalized vectors |
//! | [`context`] | Relevant-context assembly |
//! | [`extract`] | LLM structured extraction (Gemini) |
//! | [`pipeline`] | End-to-end request orchestration |
//! | [`server`] | HTTP server with SSE streaming |
//! | [`progress`] | CLI progress reporting |

pub mod chunk;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod rank;
pub mod search;
pub mod server;
