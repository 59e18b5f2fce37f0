// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search provider seam
//!
//! A provider turns a query into ranked hits. Position in the returned list
//! is the rank: the orchestrator reports sources in exactly this order, so
//! providers keep hits they cannot use (no link, odd scheme) rather than
//! closing the gap.

use async_trait::async_trait;

use super::types::{SearchError, SearchResult};

/// A web search backend
///
/// Errors are typed so the service can tell a credentials problem
/// (`SearchError::NoApiKey`, surfaced to the caller) from a transient one
/// (rate limit, timeout, API error; the next provider is tried).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `num_results` hits, best first
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    fn name(&self) -> &'static str;

    /// False when credentials are missing; unavailable providers are skipped
    fn is_available(&self) -> bool;

    /// Failover order, lower first
    fn priority(&self) -> u8 {
        100
    }
}

/// One hit as a provider API reports it
#[derive(Debug, Clone, Default)]
pub struct RawHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
    pub published_date: Option<String>,
}

/// Normalize raw hits into ranked results, keeping their order
///
/// Titles and snippets come back from APIs with embedded line breaks and
/// runs of spaces; those are collapsed. Missing fields become empty strings.
pub fn rank_hits(source: &str, hits: impl IntoIterator<Item = RawHit>) -> Vec<SearchResult> {
    hits.into_iter()
        .map(|hit| SearchResult {
            title: collapse(hit.title.as_deref()),
            url: hit.url.as_deref().map(str::trim).unwrap_or_default().to_string(),
            snippet: collapse(hit.snippet.as_deref()),
            published_date: hit.published_date.filter(|d| !d.trim().is_empty()),
            source: source.to_string(),
        })
        .collect()
}

fn collapse(text: Option<&str>) -> String {
    text.map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}
