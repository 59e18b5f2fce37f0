// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bing Search API provider
//!
//! Implements web search using the Bing Web Search API v7, either through the
//! global endpoint or an Azure Cognitive Services regional endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::provider::{rank_hits, RawHit, SearchProvider};
use super::types::{SearchError, SearchResult};

const BING_DEFAULT_ENDPOINT: &str = "https://api.bing.microsoft.com";
const BING_MAX_COUNT: usize = 50;

/// Bing Search API provider
pub struct BingSearchProvider {
    api_key: String,
    endpoint: String,
    market: String,
    safe_search: String,
    timeout_ms: u64,
    client: Client,
}

impl BingSearchProvider {
    /// Create a new Bing Search provider against the global endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_options(api_key, None, "zh-CN".to_string(), "Moderate".to_string(), 30_000)
    }

    /// Create a provider with an explicit endpoint, market and safe-search level
    pub fn with_options(
        api_key: String,
        endpoint: Option<String>,
        market: String,
        safe_search: String,
        timeout_ms: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            endpoint: endpoint.unwrap_or_else(|| BING_DEFAULT_ENDPOINT.to_string()),
            market,
            safe_search,
            timeout_ms,
            client,
        }
    }

    /// Resolve the search URL for the configured endpoint
    ///
    /// Azure regional endpoints nest the API under `/bing`.
    pub fn search_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.contains("cognitiveservices.azure.com") {
            format!("{}/bing/v7.0/search", base)
        } else {
            format!("{}/v7.0/search", base)
        }
    }
}

#[async_trait]
impl SearchProvider for BingSearchProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let count = num_results.clamp(1, BING_MAX_COUNT).to_string();
        let response = self
            .client
            .get(self.search_url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("mkt", self.market.as_str()),
                ("safeSearch", self.safe_search.as_str()),
                ("responseFilter", "Webpages"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    SearchError::api(0, &e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            return Err(SearchError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if status == 401 || status == 403 {
            return Err(SearchError::NoApiKey {
                provider: "bing".to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::api(status.as_u16(), &body));
        }

        let data: BingResponse = response
            .json()
            .await
            .map_err(|e| SearchError::api(0, &format!("JSON parse error: {}", e)))?;

        Ok(data.into_results())
    }

    fn name(&self) -> &'static str {
        "bing"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<BingWebPages>,
}

impl BingResponse {
    fn into_results(self) -> Vec<SearchResult> {
        let pages = self.web_pages.map(|pages| pages.value).unwrap_or_default();
        rank_hits(
            "bing",
            pages.into_iter().map(|r| RawHit {
                title: Some(r.name),
                url: Some(r.url),
                snippet: Some(r.snippet),
                published_date: r.date_last_crawled,
            }),
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingResult>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
    date_last_crawled: Option<String>,
}
