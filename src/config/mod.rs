// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine-wide configuration
//!
//! Every component owns its own config struct with `from_env` and
//! `validate`; `EngineConfig` bundles them so the binary and the
//! orchestrator can be wired from a single place.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::browser::{BrowserLaunchConfig, PoolConfig};
use crate::content::ContentFetchConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pipeline::PipelineConfig;
use crate::search::SearchConfig;
use crate::strategy::{RuleSet, StrategyError};
use crate::telemetry::TelemetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {section} configuration: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },

    #[error("Failed to load strategy rules from {path}: {source}")]
    Rules {
        path: PathBuf,
        #[source]
        source: StrategyError,
    },
}

/// All configuration needed to build a `QueryOrchestrator`
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub content: ContentFetchConfig,
    pub pool: PoolConfig,
    pub browser: BrowserLaunchConfig,
    pub pipeline: PipelineConfig,
    pub orchestrator: OrchestratorConfig,
    pub telemetry: TelemetryConfig,
    pub rules: RuleSet,
}

impl EngineConfig {
    /// Load every section from the environment
    ///
    /// `STRATEGY_RULES_PATH` may point at a JSON rule file replacing the
    /// built-in classifier rules.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rules = match env::var("STRATEGY_RULES_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let path = PathBuf::from(path);
                RuleSet::from_json_file(&path)
                    .map_err(|source| ConfigError::Rules { path, source })?
            }
            _ => RuleSet::builtin(),
        };

        Ok(Self {
            search: SearchConfig::from_env(),
            content: ContentFetchConfig::from_env(),
            pool: PoolConfig::from_env(),
            browser: BrowserLaunchConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
            orchestrator: OrchestratorConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
            rules,
        })
    }

    /// Validate every section, reporting the first failure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, Result<(), String>); 7] = [
            ("search", self.search.validate()),
            ("content", self.content.validate()),
            ("pool", self.pool.validate()),
            ("browser", self.browser.validate()),
            ("pipeline", self.pipeline.validate()),
            ("orchestrator", self.orchestrator.validate()),
            ("telemetry", self.telemetry.validate()),
        ];

        for (section, check) in checks {
            check.map_err(|message| ConfigError::Invalid { section, message })?;
        }
        Ok(())
    }
}
