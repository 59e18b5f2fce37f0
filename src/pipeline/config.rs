// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid fetch pipeline configuration

use std::env;
use std::time::Duration;

/// Configuration for the cheap-then-render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cheap text must be longer than this to skip rendering (default: 100)
    pub min_viable_chars: usize,
    /// Bound on the whole rendered stage, including waiting for a session (default: 45s)
    pub render_timeout: Duration,
    /// Bound on page navigation (default: 30s)
    pub navigation_timeout: Duration,
    /// Grace period after every navigation (default: 2s)
    pub settle_delay: Duration,
    /// Added to `settle_delay` when the strategy expects late dynamic content (default: 2s)
    pub dynamic_settle_extra: Duration,
    /// Pool key rendering sessions are requested under
    pub session_key: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_viable_chars: env::var("PIPELINE_MIN_VIABLE_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_viable_chars),
            render_timeout: env::var("PIPELINE_RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            navigation_timeout: env::var("PIPELINE_NAVIGATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.navigation_timeout),
            settle_delay: env::var("PIPELINE_SETTLE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            dynamic_settle_extra: env::var("PIPELINE_DYNAMIC_SETTLE_EXTRA_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.dynamic_settle_extra),
            session_key: env::var("PIPELINE_SESSION_KEY").unwrap_or(defaults.session_key),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.render_timeout.is_zero() {
            return Err("render_timeout must be greater than zero".to_string());
        }
        if self.navigation_timeout > self.render_timeout {
            return Err("navigation_timeout must not exceed render_timeout".to_string());
        }
        if self.session_key.trim().is_empty() {
            return Err("session_key must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_viable_chars: 100,
            render_timeout: Duration::from_secs(45),
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            dynamic_settle_extra: Duration::from_secs(2),
            session_key: "default".to_string(),
        }
    }
}
