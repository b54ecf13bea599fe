//! Wikipedia-backed knowledge lookup.
//!
//! Uses the MediaWiki search API and returns the matching article titles
//! with their search snippets, one per line.

use crate::capability::Lookup;
use crate::error::CapabilityError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Settings for the Wikipedia search endpoint.
#[derive(Debug, Clone)]
pub struct WikipediaSettings {
    /// MediaWiki `api.php` URL.
    pub endpoint: String,
    /// Maximum search hits joined into one snippet.
    pub max_results: usize,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            max_results: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Lookup backed by Wikipedia full-text search.
pub struct WikipediaLookup {
    settings: WikipediaSettings,
    http_client: reqwest::Client,
}

impl WikipediaLookup {
    pub fn new(settings: WikipediaSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("tribunal/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            settings,
            http_client,
        })
    }
}

#[async_trait]
impl Lookup for WikipediaLookup {
    async fn lookup(&self, query: &str, timeout: Duration) -> Result<String, CapabilityError> {
        debug!("Searching Wikipedia for: {}", query);

        let limit = self.settings.max_results.to_string();
        let response = self
            .http_client
            .get(&self.settings.endpoint)
            .timeout(timeout)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("utf8", "1"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout(timeout)
                } else {
                    CapabilityError::Provider(format!("Wikipedia request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(CapabilityError::Provider(format!(
                "Wikipedia API error {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::Provider(format!("Failed to read Wikipedia response: {}", e)))?;

        parse_search_response(&body)
    }
}

/// Turn a search API body into `"<title>: <snippet>"` lines.
fn parse_search_response(body: &str) -> Result<String, CapabilityError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| CapabilityError::Provider(format!("Malformed Wikipedia response: {}", e)))?;

    let lines: Vec<String> = parsed
        .query
        .map(|q| q.search)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| {
            let snippet = strip_markup(&hit.snippet);
            if snippet.is_empty() {
                hit.title
            } else {
                format!("{}: {}", hit.title, snippet)
            }
        })
        .collect();

    if lines.is_empty() {
        return Err(CapabilityError::NotFound);
    }

    Ok(lines.join("\n"))
}

/// Render a search snippet's HTML as one line of plain text.
fn strip_markup(snippet: &str) -> String {
    let text = html2text::from_read(snippet.as_bytes(), SNIPPET_WIDTH);

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wide enough that html2text never wraps a search snippet.
const SNIPPET_WIDTH: usize = 10_000;
