// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query strategy classification
//!
//! Scores a free-text query against the rule set and decides whether the
//! acquisition should go straight to rendering or try cheap fetches first.
//! Ties favor the cheap path.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

use super::rules::RuleSet;

const FORCE_BASIC: &str = "[[force_basic]]";
const FORCE_ADVANCED: &str = "[[force_advanced]]";

/// Sites that almost always need script execution to show content
const RENDERING_HOSTS: &[&str] = &[
    "github.com",
    "stackoverflow.com",
    "zhihu.com",
    "weibo.com",
    "twitter.com",
    "reddit.com",
];

/// Sub-domain labels typical of application front-ends
const APP_LABELS: &[&str] = &["app", "admin", "dashboard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLevel {
    Basic,
    Advanced,
    ForcedBasic,
    ForcedAdvanced,
}

impl QueryLevel {
    pub fn requires_rendering(&self) -> bool {
        matches!(self, Self::Advanced | Self::ForcedAdvanced)
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Self::ForcedBasic | Self::ForcedAdvanced)
    }
}

/// Caller-supplied hints that shift the score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// A previous attempt for this query failed
    pub previous_failed: bool,
    /// The caller explicitly asked for depth
    pub detailed_request: bool,
}

/// Classification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub level: QueryLevel,
    pub confidence: f64,
    /// Every signal that fired, in evaluation order
    pub reasons: Vec<String>,
    pub rendering_required: bool,
    pub estimated_complexity: u8,
    pub advanced_score: f64,
    pub basic_score: f64,
}

/// Per-run settings derived from an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub max_content_sources: usize,
    pub force_rendering: bool,
    pub timeout_secs: u64,
    pub capture_debug_artifacts: bool,
    pub wait_for_dynamic_settle: bool,
}

impl StrategyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Heuristic query classifier
#[derive(Debug, Clone, Default)]
pub struct QueryClassifier {
    rules: RuleSet,
}

impl QueryClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify `query`
    ///
    /// Pure: the same query and context always give the same analysis.
    pub fn analyze(&self, query: &str, context: Option<&QueryContext>) -> QueryAnalysis {
        let lowered = query.to_lowercase();

        if lowered.contains(FORCE_BASIC) {
            return forced(QueryLevel::ForcedBasic, "caller forced the basic strategy");
        }
        if lowered.contains(FORCE_ADVANCED) {
            return forced(
                QueryLevel::ForcedAdvanced,
                "caller forced the advanced strategy",
            );
        }

        let mut advanced_score = 0.0_f64;
        let mut basic_score = 0.0_f64;
        let mut reasons = Vec::new();

        for rule in self.rules.rules() {
            if rule.matches(&lowered) {
                if rule.category().is_basic() {
                    basic_score += rule.weight();
                } else {
                    advanced_score += rule.weight();
                }
                reasons.push(format!("{}: {}", rule.category().label(), rule.pattern()));
            }
        }

        if let Some(context) = context {
            let weights = self.rules.context_weights();
            if context.previous_failed {
                advanced_score += weights.previous_failed;
                reasons.push("previous attempt failed; raising the strategy level".to_string());
            }
            if context.detailed_request {
                advanced_score += weights.detailed_request;
                reasons.push("caller requested detailed information".to_string());
            }
        }

        let total = advanced_score - basic_score;
        let confidence = (0.5 + 0.1 * total.abs()).min(0.9);

        let (level, complexity) = if total >= 2.0 {
            (QueryLevel::Advanced, (2.0 + advanced_score).min(5.0))
        } else if total <= -1.0 {
            (QueryLevel::Basic, (3.0 - basic_score).max(1.0))
        } else {
            reasons.push("scores are close; preferring the cheaper basic strategy".to_string());
            (QueryLevel::Basic, 2.0)
        };

        QueryAnalysis {
            level,
            confidence,
            reasons,
            rendering_required: level.requires_rendering(),
            estimated_complexity: complexity.floor().clamp(1.0, 5.0) as u8,
            advanced_score,
            basic_score,
        }
    }

    /// Per-run configuration for an analysis
    pub fn strategy_config(&self, analysis: &QueryAnalysis) -> StrategyConfig {
        if analysis.level.requires_rendering() {
            StrategyConfig {
                max_content_sources: 5,
                force_rendering: true,
                timeout_secs: 60,
                capture_debug_artifacts: true,
                wait_for_dynamic_settle: true,
            }
        } else {
            StrategyConfig {
                max_content_sources: 3,
                force_rendering: false,
                timeout_secs: 30,
                capture_debug_artifacts: false,
                wait_for_dynamic_settle: false,
            }
        }
    }

    /// Whether a URL's host is known to need rendering
    pub fn url_prefers_rendering(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        else {
            return false;
        };

        if RENDERING_HOSTS
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        {
            return true;
        }

        // Skip the last label (TLD) so `app.` hits only real sub-domains.
        let labels: Vec<&str> = host.split('.').collect();
        labels.len() > 2 && labels[..labels.len() - 1].iter().any(|l| APP_LABELS.contains(l))
    }
}

fn forced(level: QueryLevel, reason: &str) -> QueryAnalysis {
    QueryAnalysis {
        level,
        confidence: 1.0,
        reasons: vec![reason.to_string()],
        rendering_required: level.requires_rendering(),
        estimated_complexity: if level == QueryLevel::ForcedAdvanced { 5 } else { 1 },
        advanced_score: 0.0,
        basic_score: 0.0,
    }
}

fn directive_pattern() -> Option<&'static Regex> {
    static DIRECTIVE: OnceLock<Option<Regex>> = OnceLock::new();
    DIRECTIVE
        .get_or_init(|| Regex::new(r"(?i)\[\[force_(?:basic|advanced)\]\]").ok())
        .as_ref()
}

/// Remove strategy directives so they never reach the search provider
pub fn strip_directives(query: &str) -> String {
    let stripped = match directive_pattern() {
        Some(re) => re.replace_all(query, " ").into_owned(),
        None => query.to_string(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
