// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query orchestration
//!
//! Query text in, bounded set of fetched pages out: classify, search, fetch
//! the top valid URLs through the hybrid pipeline under a deadline, and
//! aggregate everything in provider ranking order.

use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::config::OrchestratorConfig;
use super::types::{
    has_content, AcquisitionError, AcquisitionResult, ContentSummary, MethodStats, RunOptions,
    SourceInfo, StrategyInfo,
};
use crate::browser::{ChromiumEngine, SessionPool};
use crate::config::EngineConfig;
use crate::content::{ContentExtractor, HttpFetcher};
use crate::pipeline::{FetchOptions, FetchResult, HybridFetcher};
use crate::search::{is_valid_url, SearchError, SearchService};
use crate::strategy::{strip_directives, QueryClassifier};
use crate::telemetry::TelemetrySink;

struct PlannedFetch {
    rank: usize,
    url: String,
    force_rendering: bool,
}

/// Top-level acquisition entry point
pub struct QueryOrchestrator {
    search: SearchService,
    classifier: QueryClassifier,
    pipeline: HybridFetcher,
    config: OrchestratorConfig,
    telemetry: TelemetrySink,
}

impl QueryOrchestrator {
    pub fn new(
        search: SearchService,
        classifier: QueryClassifier,
        pipeline: HybridFetcher,
        config: OrchestratorConfig,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            search,
            classifier,
            pipeline,
            config,
            telemetry,
        }
    }

    /// Wire up the production stack and start the session pool's reaper
    ///
    /// Fails only on configuration problems such as missing search
    /// credentials. Must be called inside a Tokio runtime.
    pub fn from_config(config: &EngineConfig) -> Result<Self, AcquisitionError> {
        config
            .validate()
            .map_err(|e| AcquisitionError::Configuration(e.to_string()))?;

        let search = SearchService::new(config.search.clone())
            .map_err(|e| AcquisitionError::Configuration(e.to_string()))?;
        let telemetry = TelemetrySink::from_config(&config.telemetry);
        let pipeline = build_pipeline(config, telemetry.clone())?;

        Ok(Self::new(
            search,
            QueryClassifier::new(config.rules.clone()),
            pipeline,
            config.orchestrator.clone(),
            telemetry,
        ))
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    pub fn pipeline(&self) -> &HybridFetcher {
        &self.pipeline
    }

    /// Stop the session pool; pending telemetry is flushed
    pub async fn shutdown(&self) {
        self.pipeline.pool().shutdown().await;
        self.telemetry.flush().await;
    }

    /// Run one acquisition
    ///
    /// Returns `Err` only for configuration errors. Search failures, fetch
    /// failures and deadline expiry all produce a well-formed result.
    pub async fn run(
        &self,
        query: &str,
        options: RunOptions,
    ) -> Result<AcquisitionResult, AcquisitionError> {
        let started = Instant::now();

        let (analysis, applied_config) = if options.auto_strategy {
            let analysis = self.classifier.analyze(query, options.context.as_ref());
            let strategy = self.classifier.strategy_config(&analysis);
            (Some(analysis), Some(strategy))
        } else {
            (None, None)
        };

        let force_rendering = options.force_rendering.unwrap_or_else(|| {
            applied_config
                .as_ref()
                .map(|c| c.force_rendering)
                .unwrap_or(false)
        });
        let max_content_sources = options.max_content_sources.unwrap_or_else(|| {
            applied_config
                .as_ref()
                .map(|c| c.max_content_sources)
                .unwrap_or(self.config.default_max_content_sources)
        });
        let deadline = options
            .deadline
            .or_else(|| applied_config.as_ref().map(|c| c.timeout()))
            .unwrap_or(self.config.default_deadline);
        let extended_settle = applied_config
            .as_ref()
            .map(|c| c.wait_for_dynamic_settle)
            .unwrap_or(false);

        let strategy_info = StrategyInfo {
            analysis,
            applied_config,
            effective_force_rendering: force_rendering,
            effective_max_content_sources: max_content_sources,
            deadline_secs: deadline.as_secs(),
        };

        info!(
            "Acquisition start: '{}' (force_rendering={}, max_content_sources={}, deadline={:?})",
            query, force_rendering, max_content_sources, deadline
        );
        self.telemetry.record(
            "start",
            true,
            json!({
                "query": query,
                "max_results": options.max_results,
                "max_content_sources": max_content_sources,
                "force_rendering": force_rendering,
                "auto_strategy": options.auto_strategy,
                "strategy_info": strategy_info,
            }),
        );

        let deadline_at = tokio::time::Instant::now() + deadline;
        let mut result = AcquisitionResult::empty(query, strategy_info);

        let search_query = strip_directives(query);
        let search = tokio::time::timeout_at(
            deadline_at,
            self.search.search(&search_query, Some(options.max_results)),
        )
        .await;

        let response = match search {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_configuration() => {
                self.record_error(&e.to_string());
                return Err(AcquisitionError::Configuration(e.to_string()));
            }
            Ok(Err(e)) => return Ok(self.fail(result, started, search_failure(&e))),
            Err(_) => {
                result.deadline_exceeded = true;
                let message = format!("search timed out after {}s", deadline.as_secs());
                return Ok(self.fail(result, started, message));
            }
        };

        self.telemetry.record(
            "search",
            true,
            json!({
                "provider": response.provider,
                "result_count": response.result_count,
                "search_time_ms": response.search_time_ms,
            }),
        );

        result.search_provider = Some(response.provider.clone());
        result.search_results = response.results;
        result.total_sources = result.search_results.len();

        if result.search_results.is_empty() {
            info!("No search results for '{}'", query);
            result.elapsed_ms = started.elapsed().as_millis() as u64;
            self.record_complete(&result);
            return Ok(result);
        }

        let planned: Vec<PlannedFetch> = result
            .search_results
            .iter()
            .enumerate()
            .filter(|(_, item)| is_valid_url(&item.url))
            .take(max_content_sources)
            .map(|(rank, item)| PlannedFetch {
                rank,
                url: item.url.clone(),
                force_rendering: force_rendering
                    || (options.use_host_hints && self.classifier.url_prefers_rendering(&item.url)),
            })
            .collect();

        let (fetched, timed_out) = self
            .fetch_planned(&planned, extended_settle, deadline_at)
            .await;

        let mut stats = MethodStats {
            planned: planned.len(),
            ..Default::default()
        };
        let mut by_rank: Vec<Option<&FetchResult>> = vec![None; result.search_results.len()];
        for (plan, outcome) in planned.iter().zip(fetched.iter()) {
            match outcome {
                Some(fetch) => {
                    stats.record(fetch);
                    by_rank[plan.rank] = Some(fetch);
                }
                None => stats.timed_out += 1,
            }
        }

        result.sources = result
            .search_results
            .iter()
            .enumerate()
            .map(|(rank, item)| {
                let content = by_rank[rank].filter(|f| has_content(f));
                SourceInfo {
                    index: rank + 1,
                    title: item.title.clone(),
                    url: item.url.clone(),
                    snippet: if options.include_snippets {
                        item.snippet.clone()
                    } else {
                        String::new()
                    },
                    has_content: content.is_some(),
                    fetch_method: content.map(|f| f.method),
                }
            })
            .collect();

        result.content_summary = fetched
            .iter()
            .flatten()
            .filter(|f| has_content(f))
            .map(|f| ContentSummary::from_result(f, self.config.summary_chars))
            .collect();
        result.content_sources = result.content_summary.len();
        result.fetched = fetched.into_iter().flatten().collect();
        result.method_stats = stats;
        result.deadline_exceeded = timed_out;
        result.elapsed_ms = started.elapsed().as_millis() as u64;

        if timed_out {
            warn!(
                "Deadline of {}s reached; {} fetch(es) cancelled",
                deadline.as_secs(),
                stats.timed_out
            );
        }

        self.record_complete(&result);
        Ok(result)
    }

    /// Fetch planned URLs concurrently, keeping results in plan order
    ///
    /// Fetches still pending at `deadline_at` are dropped, which cancels
    /// them and releases any session they were waiting for.
    async fn fetch_planned(
        &self,
        planned: &[PlannedFetch],
        extended_settle: bool,
        deadline_at: tokio::time::Instant,
    ) -> (Vec<Option<FetchResult>>, bool) {
        let mut fetched: Vec<Option<FetchResult>> = vec![None; planned.len()];
        if planned.is_empty() {
            return (fetched, false);
        }

        let pipeline = &self.pipeline;
        let collect = async {
            let mut in_flight = futures::stream::iter(planned.iter().enumerate().map(
                |(slot, plan)| async move {
                    let options = FetchOptions {
                        force_rendering: plan.force_rendering,
                        extended_settle,
                    };
                    (slot, pipeline.fetch_with(&plan.url, options).await)
                },
            ))
            .buffer_unordered(self.config.max_concurrent_fetches.max(1));

            while let Some((slot, outcome)) = in_flight.next().await {
                debug!("Fetch {} finished: {:?}", slot, outcome.method);
                fetched[slot] = Some(outcome);
            }
        };

        let timed_out = tokio::time::timeout_at(deadline_at, collect).await.is_err();
        (fetched, timed_out)
    }

    fn fail(
        &self,
        mut result: AcquisitionResult,
        started: Instant,
        error: String,
    ) -> AcquisitionResult {
        warn!("Acquisition for '{}' failed: {}", result.query, error);
        self.record_error(&error);
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        result.with_error(error)
    }

    fn record_error(&self, error: &str) {
        self.telemetry.record("error", false, json!({ "error": error }));
    }

    fn record_complete(&self, result: &AcquisitionResult) {
        info!(
            "Acquisition complete: {} sources, {} with content, stats {:?}",
            result.total_sources, result.content_sources, result.method_stats
        );
        self.telemetry.record(
            "complete",
            true,
            json!({
                "total_sources": result.total_sources,
                "content_sources": result.content_sources,
                "method_stats": result.method_stats,
                "deadline_exceeded": result.deadline_exceeded,
                "elapsed_ms": result.elapsed_ms,
            }),
        );
    }
}

/// Build the hybrid fetch pipeline over real HTTP and Chromium backends
///
/// Starts the session pool's reaper; must be called inside a Tokio runtime.
pub fn build_pipeline(
    config: &EngineConfig,
    telemetry: TelemetrySink,
) -> Result<HybridFetcher, AcquisitionError> {
    let fetcher = HttpFetcher::new(&config.content)
        .map_err(|e| AcquisitionError::Configuration(e.to_string()))?;

    let engine = Arc::new(ChromiumEngine::new(config.browser.clone()));
    if !engine.is_available() {
        warn!("No Chrome/Chromium binary found; rendering escalations will fail");
    }
    let pool = Arc::new(SessionPool::new(engine, config.pool.clone()));
    pool.start();

    Ok(HybridFetcher::new(
        Arc::new(fetcher),
        ContentExtractor::new(&config.content),
        pool,
        config.pipeline.clone(),
        telemetry,
    ))
}

fn search_failure(error: &SearchError) -> String {
    format!("search failed: {}", error)
}
