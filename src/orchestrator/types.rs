// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Orchestrator request and result types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::content::extractor::truncate_chars;
use crate::pipeline::{FetchMethod, FetchResult};
use crate::search::SearchResult;
use crate::strategy::{QueryAnalysis, QueryContext, StrategyConfig};

/// Errors that escape `run`; everything else lands in `AcquisitionResult::error`
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Options for one acquisition run
///
/// `None` means the caller does not override the value.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_results: usize,
    pub max_content_sources: Option<usize>,
    pub force_rendering: Option<bool>,
    pub auto_strategy: bool,
    pub include_snippets: bool,
    pub context: Option<QueryContext>,
    pub deadline: Option<Duration>,
    /// Render URLs on hosts known to need scripts even in basic mode
    pub use_host_hints: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            max_content_sources: None,
            force_rendering: None,
            auto_strategy: true,
            include_snippets: true,
            context: None,
            deadline: None,
            use_host_hints: false,
        }
    }
}

/// Per-method counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStats {
    /// URLs selected for fetching
    pub planned: usize,
    pub cheap: usize,
    pub rendered: usize,
    pub failed: usize,
    /// URLs cancelled by the deadline before producing a result
    pub timed_out: usize,
}

impl MethodStats {
    pub fn record(&mut self, result: &FetchResult) {
        if has_content(result) {
            match result.method {
                FetchMethod::Cheap => self.cheap += 1,
                FetchMethod::Rendered => self.rendered += 1,
            }
        } else {
            self.failed += 1;
        }
    }
}

/// One search result with its fetch outcome, in provider order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// 1-based rank
    pub index: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub has_content: bool,
    pub fetch_method: Option<FetchMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub url: String,
    pub summary: String,
    pub method: FetchMethod,
}

impl ContentSummary {
    pub fn from_result(result: &FetchResult, max_chars: usize) -> Self {
        let text = &result.extracted_text;
        let summary = if text.chars().count() > max_chars {
            format!("{}...", truncate_chars(text, max_chars))
        } else {
            text.clone()
        };

        Self {
            url: result.url.clone(),
            summary,
            method: result.method,
        }
    }
}

/// How the strategy shaped this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub analysis: Option<QueryAnalysis>,
    pub applied_config: Option<StrategyConfig>,
    pub effective_force_rendering: bool,
    pub effective_max_content_sources: usize,
    pub deadline_secs: u64,
}

/// Aggregate outcome of one acquisition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub query: String,
    pub search_results: Vec<SearchResult>,
    pub fetched: Vec<FetchResult>,
    pub sources: Vec<SourceInfo>,
    pub method_stats: MethodStats,
    pub strategy_info: StrategyInfo,
    pub content_summary: Vec<ContentSummary>,
    pub total_sources: usize,
    pub content_sources: usize,
    pub search_provider: Option<String>,
    pub deadline_exceeded: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl AcquisitionResult {
    /// A result with no search results or fetches
    pub fn empty(query: &str, strategy_info: StrategyInfo) -> Self {
        Self {
            query: query.to_string(),
            search_results: Vec::new(),
            fetched: Vec::new(),
            sources: Vec::new(),
            method_stats: MethodStats::default(),
            strategy_info,
            content_summary: Vec::new(),
            total_sources: 0,
            content_sources: 0,
            search_provider: None,
            deadline_exceeded: false,
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A fetch counts as content only if it succeeded with text
pub(crate) fn has_content(result: &FetchResult) -> bool {
    result.succeeded && !result.extracted_text.is_empty()
}
