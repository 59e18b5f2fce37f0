// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query orchestration
//!
//! Ties the strategy classifier, search service and hybrid fetch pipeline
//! together into a single `run(query, options)` call.

pub mod config;
pub mod service;
pub mod types;

pub use config::OrchestratorConfig;
pub use service::{build_pipeline, QueryOrchestrator};
pub use types::{
    AcquisitionError, AcquisitionResult, ContentSummary, MethodStats, RunOptions, SourceInfo,
    StrategyInfo,
};
