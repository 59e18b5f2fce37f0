// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendering engine abstraction
//!
//! A rendering engine launches heavyweight, stateful sessions (one headless
//! browser process each). Sessions open short-lived pages which navigate,
//! settle and hand back their rendered text. The pool only talks to these
//! traits so tests can substitute an in-process engine.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Rendering engine error types
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Rendering engine unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to launch rendering session: {0}")]
    Launch(String),

    #[error("Failed to open page: {0}")]
    Page(String),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Failed to read rendered text: {0}")]
    Extraction(String),

    #[error("Failed to close rendering resource: {0}")]
    Close(String),
}

/// How a page should navigate and settle
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Upper bound for navigation itself, excluding the settle delay
    pub timeout: Duration,
    /// Grace period after navigation for late scripts and XHR
    pub settle_delay: Duration,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Launches rendering sessions
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Launch a new isolated session
    async fn launch(&self) -> Result<Arc<dyn RenderSession>, RenderError>;

    /// Engine name for logs
    fn name(&self) -> &'static str;
}

/// One live rendering session (a browser process and its context)
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Open a fresh page in this session
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError>;

    /// Tear the session down; later calls on it may fail
    async fn close(&self) -> Result<(), RenderError>;
}

/// A page owned by exactly one caller at a time
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Navigate to `url` and wait for the page to settle
    async fn navigate(&self, url: &str, options: &NavigationOptions) -> Result<(), RenderError>;

    /// Rendered plain text of the document body
    async fn inner_text(&self) -> Result<String, RenderError>;

    async fn close(&self) -> Result<(), RenderError>;
}
