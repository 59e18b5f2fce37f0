// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid fetch pipeline
//!
//! Cheap HTTP fetch first; escalate to a pooled rendering session only when
//! the cheap result is missing, too short, or looks script-generated.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::config::PipelineConfig;
use crate::browser::{NavigationOptions, SessionPool};
use crate::content::extractor::truncate_chars;
use crate::content::{ContentExtractor, PageFetcher};
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Cheap,
    Rendered,
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cheap => write!(f, "cheap"),
            Self::Rendered => write!(f, "rendered"),
        }
    }
}

/// Outcome of fetching one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub extracted_text: String,
    pub succeeded: bool,
    pub method: FetchMethod,
    pub is_dynamic_content_suspected: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Why the rendered stage ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationReason {
    Forced,
    CheapFailed { error: String },
    InsufficientContent { chars: usize },
    DynamicContent,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "rendering forced"),
            Self::CheapFailed { error } => write!(f, "cheap fetch failed: {}", error),
            Self::InsufficientContent { chars } => {
                write!(f, "insufficient content ({} chars)", chars)
            }
            Self::DynamicContent => write!(f, "dynamic content suspected"),
        }
    }
}

/// Result of the cheap stage
#[derive(Debug, Clone, PartialEq)]
pub enum CheapOutcome {
    Sufficient(FetchResult),
    Insufficient {
        partial: Option<FetchResult>,
        reason: EscalationReason,
    },
}

/// Per-call pipeline options
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub force_rendering: bool,
    /// Wait longer after navigation for late dynamic content
    pub extended_settle: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            force_rendering: false,
            extended_settle: false,
        }
    }
}

/// Cheap-first fetcher with rendering escalation
pub struct HybridFetcher {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    pool: Arc<SessionPool>,
    config: PipelineConfig,
    telemetry: TelemetrySink,
}

impl HybridFetcher {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: ContentExtractor,
        pool: Arc<SessionPool>,
        config: PipelineConfig,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pool,
            config,
            telemetry,
        }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    /// Fetch one URL, rendering it when forced or when the cheap path falls short
    pub async fn fetch(&self, url: &str, force_rendering: bool) -> FetchResult {
        self.fetch_with(
            url,
            FetchOptions {
                force_rendering,
                ..Default::default()
            },
        )
        .await
    }

    /// Like [`fetch`](Self::fetch) with explicit options
    ///
    /// Never fails: errors end up in `FetchResult::error`.
    pub async fn fetch_with(&self, url: &str, options: FetchOptions) -> FetchResult {
        let started = Instant::now();
        self.telemetry.record(
            "fetch_start",
            true,
            json!({"url": url, "force_rendering": options.force_rendering}),
        );

        let (partial, reason) = if options.force_rendering {
            (None, EscalationReason::Forced)
        } else {
            match self.cheap_stage(url, started).await {
                CheapOutcome::Sufficient(result) => {
                    self.record_success(&result);
                    return result;
                }
                CheapOutcome::Insufficient { partial, reason } => (partial, reason),
            }
        };

        info!("Escalating {} to rendering: {}", url, reason);
        self.telemetry.record(
            "fallback_to_rendering",
            true,
            json!({"url": url, "reason": reason.to_string()}),
        );

        let dynamic = partial
            .as_ref()
            .map(|p| p.is_dynamic_content_suspected)
            .unwrap_or(false);

        let render_error = match self.render_stage(url, options.extended_settle).await {
            Ok(text) if !text.is_empty() => {
                let result = FetchResult {
                    url: url.to_string(),
                    extracted_text: text,
                    succeeded: true,
                    method: FetchMethod::Rendered,
                    is_dynamic_content_suspected: dynamic,
                    error: None,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                self.record_success(&result);
                return result;
            }
            Ok(_) => "rendered page contained no text".to_string(),
            Err(e) => e,
        };

        warn!("Rendering failed for {}: {}", url, render_error);
        self.telemetry.record(
            "render_failed",
            false,
            json!({"url": url, "error": render_error}),
        );

        // Best effort: a non-empty cheap result beats an empty rendered one.
        if let Some(mut partial) = partial.filter(|p| !p.extracted_text.is_empty()) {
            partial.error = Some(format!("{}; rendering failed: {}", reason, render_error));
            partial.elapsed_ms = started.elapsed().as_millis() as u64;
            self.record_success(&partial);
            return partial;
        }

        let error = match &reason {
            EscalationReason::CheapFailed { error } => {
                format!("cheap fetch failed: {}; rendering failed: {}", error, render_error)
            }
            _ => render_error,
        };

        self.telemetry
            .record("fetch_failed", false, json!({"url": url, "error": error}));

        FetchResult {
            url: url.to_string(),
            extracted_text: String::new(),
            succeeded: false,
            method: FetchMethod::Rendered,
            is_dynamic_content_suspected: dynamic,
            error: Some(error),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Plain HTTP fetch plus extraction, judged for sufficiency
    pub async fn cheap_stage(&self, url: &str, started: Instant) -> CheapOutcome {
        let html = match self.fetcher.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                debug!("Cheap fetch failed for {}: {}", url, e);
                return CheapOutcome::Insufficient {
                    partial: None,
                    reason: EscalationReason::CheapFailed {
                        error: e.to_string(),
                    },
                };
            }
        };

        let extraction = self.extractor.extract(&html);
        let chars = extraction.text.chars().count();

        let result = FetchResult {
            url: url.to_string(),
            extracted_text: extraction.text,
            succeeded: true,
            method: FetchMethod::Cheap,
            is_dynamic_content_suspected: extraction.is_dynamic_content_suspected,
            error: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if result.is_dynamic_content_suspected {
            CheapOutcome::Insufficient {
                partial: Some(result),
                reason: EscalationReason::DynamicContent,
            }
        } else if chars <= self.config.min_viable_chars {
            CheapOutcome::Insufficient {
                partial: Some(result),
                reason: EscalationReason::InsufficientContent { chars },
            }
        } else {
            CheapOutcome::Sufficient(result)
        }
    }

    /// Render `url` on a pooled page and return its capped text
    async fn render_stage(&self, url: &str, extended_settle: bool) -> Result<String, String> {
        let navigation = NavigationOptions {
            timeout: self.config.navigation_timeout,
            settle_delay: self.settle_delay(extended_settle),
        };

        let work = async {
            let page = self
                .pool
                .acquire_page(&self.config.session_key)
                .await
                .map_err(|e| e.to_string())?;

            let text = match page.page().navigate(url, &navigation).await {
                Ok(()) => page.page().inner_text().await,
                Err(e) => Err(e),
            };
            page.release().await;

            text.map(|t| truncate_chars(t.trim(), self.extractor.max_chars()))
                .map_err(|e| e.to_string())
        };

        tokio::time::timeout(self.config.render_timeout, work)
            .await
            .map_err(|_| {
                format!(
                    "rendering timed out after {}s (waiting for a session or loading the page)",
                    self.config.render_timeout.as_secs()
                )
            })?
    }

    /// Grace period after navigation; extension only ever adds to the base delay
    pub fn settle_delay(&self, extended: bool) -> Duration {
        if extended {
            self.config.settle_delay + self.config.dynamic_settle_extra
        } else {
            self.config.settle_delay
        }
    }

    fn record_success(&self, result: &FetchResult) {
        debug!(
            "Fetched {} via {} ({} chars)",
            result.url,
            result.method,
            result.extracted_text.chars().count()
        );
        self.telemetry.record(
            "fetch_success",
            true,
            json!({
                "url": result.url,
                "method": result.method,
                "chars": result.extracted_text.chars().count(),
                "partial": result.error.is_some(),
            }),
        );
    }
}
