// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search service orchestration
//!
//! Coordinates search providers and rate limiting.

use std::time::Instant;
use tracing::{debug, info, warn};

use super::bing::BingSearchProvider;
use super::config::SearchConfig;
use super::google::GoogleSearchProvider;
use super::provider::SearchProvider;
use super::rate_limiter::SearchRateLimiter;
use super::types::{SearchError, SearchResponse};

/// Search service that tries providers in priority order behind a rate limiter
pub struct SearchService {
    providers: Vec<Box<dyn SearchProvider>>,
    rate_limiter: SearchRateLimiter,
    config: SearchConfig,
}

impl SearchService {
    /// Create a search service from configuration
    ///
    /// Fails fast with `SearchError::NoApiKey` when no provider has credentials.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();

        if let (Some(api_key), Some(cx)) = (
            config.providers.google_api_key.clone(),
            config.providers.google_cse_cx.clone(),
        ) {
            let provider = GoogleSearchProvider::with_timeout(api_key, cx, config.request_timeout_ms)
                .with_site(config.providers.google_site.clone())
                .with_date_restrict(config.providers.google_date_restrict.clone())
                .with_safe(Some(config.providers.safe_search.clone()));
            providers.push(Box::new(provider));
            debug!("Google Custom Search provider enabled");
        }

        if let Some(api_key) = config.providers.bing_api_key.clone() {
            providers.push(Box::new(BingSearchProvider::with_options(
                api_key,
                config.providers.bing_endpoint.clone(),
                config.providers.bing_market.clone(),
                config.providers.safe_search.clone(),
                config.request_timeout_ms,
            )));
            debug!("Bing Search provider enabled");
        }

        Self::with_providers(providers, config)
    }

    /// Create a search service over explicit providers
    pub fn with_providers(
        mut providers: Vec<Box<dyn SearchProvider>>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        if !providers.iter().any(|p| p.is_available()) {
            return Err(SearchError::NoApiKey {
                provider: "any search provider (set GOOGLE_API_KEY + GOOGLE_CSE_CX or BING_SEARCH_KEY)"
                    .to_string(),
            });
        }

        // Sort by priority (lower = preferred)
        providers.sort_by_key(|p| p.priority());

        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);

        Ok(Self {
            providers,
            rate_limiter,
            config,
        })
    }

    /// Perform a search
    ///
    /// # Arguments
    /// * `query` - The search query
    /// * `num_results` - Optional number of results (uses default if None)
    pub async fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery {
                reason: "query is empty".to_string(),
            });
        }

        let num_results = num_results.unwrap_or(self.config.default_num_results);

        self.rate_limiter.check()?;

        let start = Instant::now();
        let mut last_error: Option<SearchError> = None;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }

            debug!("Trying search provider: {}", provider.name());

            match provider.search(query, num_results).await {
                Ok(mut results) => {
                    results.truncate(num_results);
                    let elapsed_ms = start.elapsed().as_millis() as u64;

                    info!(
                        "Search complete: {} results from {} in {}ms",
                        results.len(),
                        provider.name(),
                        elapsed_ms
                    );

                    return Ok(SearchResponse {
                        query: query.to_string(),
                        result_count: results.len(),
                        results,
                        search_time_ms: elapsed_ms,
                        provider: provider.name().to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Search provider {} failed: {}, trying next",
                        provider.name(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(SearchError::ProviderUnavailable {
            provider: "all".to_string(),
        }))
    }

    /// Get list of available provider names
    pub fn available_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }
}
