// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web search functionality

use std::env;

/// Configuration for web search functionality
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Provider-specific configuration
    pub providers: SearchProviderConfig,
    /// Rate limit (requests per minute)
    pub rate_limit_per_minute: u32,
    /// Default number of results per search
    pub default_num_results: usize,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default)]
pub struct SearchProviderConfig {
    /// Google Custom Search API key
    pub google_api_key: Option<String>,
    /// Google Programmable Search Engine id (`cx`)
    pub google_cse_cx: Option<String>,
    /// Optional site restriction for Google (`siteSearch`)
    pub google_site: Option<String>,
    /// Optional Google recency restriction (`dateRestrict`, e.g. `d7`)
    pub google_date_restrict: Option<String>,
    /// Bing Web Search subscription key
    pub bing_api_key: Option<String>,
    /// Bing endpoint base (global or Azure regional)
    pub bing_endpoint: Option<String>,
    /// Bing market code
    pub bing_market: String,
    /// Safe search level passed to providers
    pub safe_search: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            providers: SearchProviderConfig {
                google_api_key: non_empty_var("GOOGLE_API_KEY"),
                google_cse_cx: non_empty_var("GOOGLE_CSE_CX"),
                google_site: non_empty_var("GOOGLE_SITE_SEARCH"),
                google_date_restrict: non_empty_var("GOOGLE_DATE_RESTRICT"),
                bing_api_key: non_empty_var("BING_SEARCH_KEY"),
                bing_endpoint: non_empty_var("BING_ENDPOINT"),
                bing_market: env::var("BING_MARKET").unwrap_or_else(|_| "zh-CN".to_string()),
                safe_search: env::var("SEARCH_SAFE").unwrap_or_else(|_| "Moderate".to_string()),
            },
            rate_limit_per_minute: env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            default_num_results: 5,
            request_timeout_ms: env::var("SEARCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("Search timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Google needs both the key and the engine id
    pub fn has_google(&self) -> bool {
        self.providers.google_api_key.is_some() && self.providers.google_cse_cx.is_some()
    }

    /// Bing needs a subscription key
    pub fn has_bing(&self) -> bool {
        self.providers.bing_api_key.is_some()
    }

    /// Check if any search provider is configured
    pub fn has_any_provider(&self) -> bool {
        self.has_google() || self.has_bing()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: SearchProviderConfig {
                bing_market: "zh-CN".to_string(),
                safe_search: "Moderate".to_string(),
                ..Default::default()
            },
            rate_limit_per_minute: 60,
            default_num_results: 5,
            request_timeout_ms: 30_000,
        }
    }
}
