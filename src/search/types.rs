// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web search functionality

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of response body characters carried in an API error
pub const ERROR_BODY_LIMIT: usize = 500;

/// A single search result from a web search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the search result
    pub title: String,
    /// URL of the search result
    pub url: String,
    /// Snippet/description of the search result
    pub snippet: String,
    /// Published date if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Source provider (e.g., "google", "bing")
    #[serde(default)]
    pub source: String,
}

impl SearchResult {
    /// Check whether the result URL is syntactically usable (scheme + host)
    pub fn has_valid_url(&self) -> bool {
        is_valid_url(&self.url)
    }
}

/// Check that a URL parses and carries both a scheme and a host
pub fn is_valid_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Response from a search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The query sent to the provider
    pub query: String,
    /// List of search results, in provider ranking order
    pub results: Vec<SearchResult>,
    /// Time taken for the search in milliseconds
    pub search_time_ms: u64,
    /// Provider that returned the results
    pub provider: String,
    /// Number of results returned
    pub result_count: usize,
}

/// Errors that can occur during search operations
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Rate limited by the search provider or the local limiter
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// API error from the search provider
    #[error("Search API error: {status} - {message}")]
    ApiError {
        /// HTTP status code (0 for transport errors)
        status: u16,
        /// Error message or truncated response body
        message: String,
    },

    /// Search request timed out
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Search provider is unavailable
    #[error("Provider unavailable: {provider}")]
    ProviderUnavailable {
        /// Name of the unavailable provider
        provider: String,
    },

    /// No credentials configured for any provider
    #[error("No API key configured for {provider}")]
    NoApiKey {
        /// Name of the provider missing credentials
        provider: String,
    },

    /// Invalid search query
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// Reason the query is invalid
        reason: String,
    },
}

impl SearchError {
    /// Build an API error, truncating the response body
    pub fn api(status: u16, body: &str) -> Self {
        SearchError::ApiError {
            status,
            message: truncate_body(body),
        }
    }

    /// Configuration errors are surfaced to the caller instead of being degraded
    pub fn is_configuration(&self) -> bool {
        matches!(self, SearchError::NoApiKey { .. })
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
