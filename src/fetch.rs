//! Page fetching and HTML-to-text reduction.
//!
//! [`PageFetcher`] is the port the pipeline talks to. [`HttpFetcher`] fetches
//! a URL with a bounded timeout (redirects followed), parses the HTML, drops
//! `<script>`/`<style>` subtrees, and collapses all whitespace runs into
//! single spaces. Any failure yields an empty string; the page is simply
//! dropped from the corpus and the failure is logged, not streamed.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node};

use crate::config::FetchConfig;

/// Trait for page fetchers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its plain text, or an empty string on any
    /// failure.
    async fn fetch(&self, url: &str) -> String;
}

/// HTTP page fetcher with a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    async fn try_fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let html = response.text().await?;
        Ok(html_to_text(&html))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "dropping page: fetch failed");
                String::new()
            }
        }
    }
}

/// Reduce an HTML document to plain text.
///
/// Text inside `script`, `style`, `noscript`, and `template` elements is
/// skipped; everything else is concatenated and whitespace-collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buf = String::new();
    collect_text(document.root_element(), &mut buf);
    collapse_whitespace(&buf)
}

fn collect_text(element: ElementRef<'_>, buf: &mut String) {
    if matches!(
        element.value().name(),
        "script" | "style" | "noscript" | "template"
    ) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                buf.push_str(text);
                buf.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, buf);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim().to_string()
}
