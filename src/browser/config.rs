// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendering pool and browser launch configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Desktop browser identity presented by rendering sessions
pub const DEFAULT_BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Session pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum live sessions (default: 2)
    pub max_sessions: usize,
    /// Session reuse window and idle limit (default: 300s)
    pub session_timeout: Duration,
    /// Reaper interval (default: 60s)
    pub cleanup_interval: Duration,
}

impl PoolConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_sessions: env::var("RENDER_MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_sessions),
            session_timeout: env::var("RENDER_SESSION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_timeout),
            cleanup_interval: env::var("RENDER_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions == 0 {
            return Err("max_sessions must be at least 1".to_string());
        }
        if self.session_timeout.is_zero() {
            return Err("session_timeout must be greater than zero".to_string());
        }
        if self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: 2,
            session_timeout: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Parameters for launching a headless browser session
#[derive(Debug, Clone)]
pub struct BrowserLaunchConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// Explicit browser binary; detected when unset
    pub chrome_executable: Option<PathBuf>,
}

impl BrowserLaunchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            headless: env::var("RENDER_HEADLESS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.headless),
            user_agent: env::var("RENDER_USER_AGENT").unwrap_or(defaults.user_agent),
            chrome_executable: env::var("CHROME").ok().map(PathBuf::from),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err("viewport dimensions must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for BrowserLaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1440,
            viewport_height: 900,
            user_agent: DEFAULT_BROWSER_USER_AGENT.to_string(),
            chrome_executable: None,
        }
    }
}
