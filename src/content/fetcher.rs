// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cheap HTTP page fetching
//!
//! Plain GET requests with a bounded timeout and redirect policy. No
//! JavaScript is executed here; rendering is the browser pool's job.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::charset::{charset_from_content_type, decode_body};
use super::config::ContentFetchConfig;
use crate::search::is_valid_url;

/// Cheap fetch error types
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout fetching: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} for: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// True for failures a retry might not reproduce
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Http(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl(_) | Self::Client(_) => false,
        }
    }
}

/// Fetches raw HTML for a URL without executing scripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the document at `url` and return its markup
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed cheap fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ContentFetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        if !is_valid_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        debug!("Fetching content from: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let charset = content_type.as_deref().and_then(charset_from_content_type);
        Ok(decode_body(&body, charset))
    }
}
