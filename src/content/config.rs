// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for cheap fetching and text extraction
//!
//! Defines settings for HTTP fetching and content limits.

use std::env;

/// Descriptive client identifier sent with cheap fetches
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; SmartWebQuery/0.1; +https://github.com/fabstir) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for content fetching
#[derive(Debug, Clone)]
pub struct ContentFetchConfig {
    /// Timeout per cheap fetch in seconds (default: 15)
    pub timeout_secs: u64,
    /// User agent for cheap fetches
    pub user_agent: String,
    /// Maximum redirects followed (default: 5)
    pub max_redirects: usize,
    /// Maximum characters of extracted text per page (default: 5000)
    pub max_chars: usize,
    /// Extracted text below this length marks a page as probably dynamic (default: 200)
    pub min_text_chars: usize,
    /// More empty `div`s than this marks a page as probably dynamic (default: 10)
    pub max_empty_containers: usize,
}

impl ContentFetchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_secs: env::var("CHEAP_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: env::var("CHEAP_FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            max_redirects: defaults.max_redirects,
            max_chars: env::var("CONTENT_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chars),
            min_text_chars: defaults.min_text_chars,
            max_empty_containers: defaults.max_empty_containers,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.max_chars < 100 {
            return Err("max_chars must be at least 100".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ContentFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
            max_chars: 5000,
            min_text_chars: 200,
            max_empty_containers: 10,
        }
    }
}
