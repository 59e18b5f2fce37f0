// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Adaptive web content acquisition
//!
//! Classify a query, search for it, and fetch the top results with a cheap
//! HTTP fetch first, escalating to a pooled headless browser only when the
//! static HTML is not good enough.

pub mod browser;
pub mod cli;
pub mod config;
pub mod content;
pub mod orchestrator;
pub mod pipeline;
pub mod search;
pub mod strategy;
pub mod telemetry;

pub use browser::{ChromiumEngine, PoolConfig, SessionPool};
pub use config::{ConfigError, EngineConfig};
pub use content::{ContentExtractor, HttpFetcher, PageFetcher};
pub use orchestrator::{
    AcquisitionError, AcquisitionResult, OrchestratorConfig, QueryOrchestrator, RunOptions,
};
pub use pipeline::{FetchMethod, FetchResult, HybridFetcher};
pub use search::{SearchConfig, SearchService};
pub use strategy::{QueryAnalysis, QueryClassifier, QueryLevel};
pub use telemetry::{TelemetryConfig, TelemetrySink};
