// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Google Custom Search provider
//!
//! Uses the Programmable Search Engine JSON API. Requires both an API key
//! and a search engine id (`cx`).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::provider::{rank_hits, RawHit, SearchProvider};
use super::types::{SearchError, SearchResult};

const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results per request are capped to keep downstream summaries small
const GOOGLE_MAX_NUM: usize = 8;

/// Google Custom Search provider
pub struct GoogleSearchProvider {
    api_key: String,
    cx: String,
    site: Option<String>,
    date_restrict: Option<String>,
    safe: Option<String>,
    timeout_ms: u64,
    client: Client,
}

impl GoogleSearchProvider {
    /// Create a new Google provider
    pub fn new(api_key: String, cx: String) -> Self {
        Self::with_timeout(api_key, cx, 30_000)
    }

    /// Create a provider with an explicit request timeout
    pub fn with_timeout(api_key: String, cx: String, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            cx,
            site: None,
            date_restrict: None,
            safe: None,
            timeout_ms,
            client,
        }
    }

    /// Restrict results to one site
    pub fn with_site(mut self, site: Option<String>) -> Self {
        self.site = site;
        self
    }

    /// Restrict results by recency (`d7`, `w2`, `m1`, ...)
    pub fn with_date_restrict(mut self, date_restrict: Option<String>) -> Self {
        self.date_restrict = date_restrict;
        self
    }

    /// Safe search level; only values the API understands are forwarded
    pub fn with_safe(mut self, safe: Option<String>) -> Self {
        self.safe = safe
            .map(|s| s.to_lowercase())
            .filter(|s| matches!(s.as_str(), "active" | "off" | "high" | "medium"));
        self
    }

    fn build_params(&self, query: &str, num_results: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("num", num_results.clamp(1, GOOGLE_MAX_NUM).to_string()),
            ("key", self.api_key.clone()),
            ("cx", self.cx.clone()),
        ];
        if let Some(site) = &self.site {
            params.push(("siteSearch", site.clone()));
        }
        if let Some(safe) = &self.safe {
            params.push(("safe", safe.clone()));
        }
        if let Some(date_restrict) = &self.date_restrict {
            params.push(("dateRestrict", date_restrict.clone()));
        }
        params
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(GOOGLE_CSE_URL)
            .query(&self.build_params(query, num_results))
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

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::api(status.as_u16(), &body));
        }

        // An unparseable body is treated as "no items"
        let data: GoogleResponse = response.json().await.unwrap_or_default();

        Ok(data.into_results())
    }

    fn name(&self) -> &'static str {
        "google"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() && !self.cx.is_empty()
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Option<Vec<GoogleItem>>,
}

impl GoogleResponse {
    fn into_results(self) -> Vec<SearchResult> {
        rank_hits(
            "google",
            self.items.unwrap_or_default().into_iter().map(|item| RawHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
                published_date: None,
            }),
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct GoogleItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}
