// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Orchestrator configuration

use std::env;
use std::time::Duration;

/// Query orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Fetches in flight per run (default: 4)
    pub max_concurrent_fetches: usize,
    /// Deadline when neither caller nor strategy sets one (default: 60s)
    pub default_deadline: Duration,
    /// Search results requested when the caller does not say (default: 5)
    pub default_max_results: usize,
    /// Pages fetched when neither caller nor strategy says (default: 3)
    pub default_max_content_sources: usize,
    /// Characters kept per content summary (default: 500)
    pub summary_chars: usize,
}

impl OrchestratorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_fetches: env::var("ACQUISITION_MAX_CONCURRENT_FETCHES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_fetches),
            default_deadline: env::var("ACQUISITION_DEADLINE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_deadline),
            default_max_results: env::var("ACQUISITION_MAX_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_max_results),
            default_max_content_sources: env::var("ACQUISITION_MAX_CONTENT_SOURCES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_max_content_sources),
            summary_chars: defaults.summary_chars,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be at least 1".to_string());
        }
        if self.default_deadline.is_zero() {
            return Err("default_deadline must be greater than zero".to_string());
        }
        if self.default_max_results == 0 || self.default_max_results > 50 {
            return Err("default_max_results must be between 1 and 50".to_string());
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 4,
            default_deadline: Duration::from_secs(60),
            default_max_results: 5,
            default_max_content_sources: 3,
            summary_chars: 500,
        }
    }
}
