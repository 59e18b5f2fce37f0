// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signal rules for query classification
//!
//! The classifier is a pure scoring function over an ordered rule list. The
//! built-in list can be replaced by rules loaded from JSON.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Strategy/rule error types
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    #[error("Invalid rule pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid weight {weight} for rule '{pattern}'")]
    InvalidWeight { pattern: String, weight: f64 },

    #[error("Failed to read rule file: {0}")]
    Io(String),

    #[error("Failed to parse rule file: {0}")]
    Parse(String),
}

/// Which family a signal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    AdvancedKeyword,
    BasicKeyword,
    TimeRecency,
    Technical,
    Interactive,
}

impl SignalCategory {
    /// Basic keywords pull toward the cheap path; everything else pushes
    /// toward rendering.
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::BasicKeyword)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AdvancedKeyword => "advanced keyword",
            Self::BasicKeyword => "basic keyword",
            Self::TimeRecency => "time-recency pattern",
            Self::Technical => "technical pattern",
            Self::Interactive => "interactive pattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Substring of the lowercased query
    Keyword,
    /// Regex searched in the lowercased query
    Regex,
}

/// Serializable rule definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub kind: RuleKind,
    pub weight: f64,
    pub category: SignalCategory,
}

impl RuleSpec {
    pub fn keyword(pattern: &str, weight: f64, category: SignalCategory) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: RuleKind::Keyword,
            weight,
            category,
        }
    }

    pub fn regex(pattern: &str, weight: f64, category: SignalCategory) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: RuleKind::Regex,
            weight,
            category,
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Keyword(String),
    Regex(Regex),
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct SignalRule {
    pattern: String,
    matcher: Matcher,
    weight: f64,
    category: SignalCategory,
}

impl SignalRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, StrategyError> {
        if !spec.weight.is_finite() || spec.weight < 0.0 {
            return Err(StrategyError::InvalidWeight {
                pattern: spec.pattern.clone(),
                weight: spec.weight,
            });
        }

        let matcher = match spec.kind {
            RuleKind::Keyword => Matcher::Keyword(spec.pattern.to_lowercase()),
            RuleKind::Regex => Matcher::Regex(Regex::new(&spec.pattern).map_err(|e| {
                StrategyError::InvalidPattern {
                    pattern: spec.pattern.clone(),
                    message: e.to_string(),
                }
            })?),
        };

        Ok(Self {
            pattern: spec.pattern.clone(),
            matcher,
            weight: spec.weight,
            category: spec.category,
        })
    }

    /// Whether the rule fires on an already-lowercased query
    pub fn matches(&self, lowered_query: &str) -> bool {
        match &self.matcher {
            Matcher::Keyword(keyword) => lowered_query.contains(keyword.as_str()),
            Matcher::Regex(regex) => regex.is_match(lowered_query),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn category(&self) -> SignalCategory {
        self.category
    }
}

/// Score adjustments taken from the caller's context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextWeights {
    pub previous_failed: f64,
    pub detailed_request: f64,
}

impl Default for ContextWeights {
    fn default() -> Self {
        Self {
            previous_failed: 2.0,
            detailed_request: 1.0,
        }
    }
}

/// Ordered, compiled rule list
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<SignalRule>,
    context: ContextWeights,
}

const ADVANCED_KEYWORDS: &[&str] = &[
    // real-time and tools
    "实时", "最新", "动态", "交互", "在线工具", "计算器", "转换器",
    // social and community sites
    "微博", "知乎", "github", "stackoverflow", "reddit", "twitter",
    // commerce
    "价格", "库存", "评价", "商品", "购买", "下单",
    // script-heavy pages
    "图表", "可视化", "dashboard", "控制台", "管理后台",
    // recency
    "今天", "昨天", "本周", "最近", "刚刚", "现在",
];

const BASIC_KEYWORDS: &[&str] = &[
    "定义", "概念", "历史", "介绍", "原理", "基础", "入门",
    "文档", "教程", "指南", "手册", "说明", "规范",
    "新闻", "报道", "文章", "博客", "论文", "研究",
];

const TIME_PATTERNS: &[&str] = &[
    r"最新|latest|newest|recent",
    r"今天|today|现在|now|当前|current",
    r"实时|real.?time|live",
    r"\d+年\d+月|\d{4}-\d{2}|202[0-9]",
];

const TECHNICAL_PATTERNS: &[&str] = &[
    r"api|接口|调用",
    r"代码|code|编程|programming",
    r"配置|config|设置|setting",
    r"工具|tool|软件|software",
];

const INTERACTIVE_PATTERNS: &[&str] = &[
    r"如何使用|怎么用|操作步骤",
    r"登录|注册|下载|安装",
    r"在线|online|web版",
];

/// The built-in rule definitions in evaluation order
pub fn builtin_specs() -> Vec<RuleSpec> {
    let mut specs = Vec::new();
    specs.extend(
        ADVANCED_KEYWORDS
            .iter()
            .map(|k| RuleSpec::keyword(k, 1.0, SignalCategory::AdvancedKeyword)),
    );
    specs.extend(
        BASIC_KEYWORDS
            .iter()
            .map(|k| RuleSpec::keyword(k, 1.0, SignalCategory::BasicKeyword)),
    );
    specs.extend(
        TIME_PATTERNS
            .iter()
            .map(|p| RuleSpec::regex(p, 2.0, SignalCategory::TimeRecency)),
    );
    specs.extend(
        TECHNICAL_PATTERNS
            .iter()
            .map(|p| RuleSpec::regex(p, 1.0, SignalCategory::Technical)),
    );
    specs.extend(
        INTERACTIVE_PATTERNS
            .iter()
            .map(|p| RuleSpec::regex(p, 1.5, SignalCategory::Interactive)),
    );
    specs
}

impl RuleSet {
    /// The built-in heuristic rules
    pub fn builtin() -> Self {
        let rules = builtin_specs()
            .iter()
            .filter_map(|spec| match SignalRule::compile(spec) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("Skipping built-in rule: {}", e);
                    None
                }
            })
            .collect();

        Self {
            rules,
            context: ContextWeights::default(),
        }
    }

    /// Compile externally supplied rules, keeping their order
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, StrategyError> {
        let rules = specs
            .iter()
            .map(SignalRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            context: ContextWeights::default(),
        })
    }

    /// Load rules from a JSON array of rule definitions
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StrategyError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StrategyError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        let specs: Vec<RuleSpec> =
            serde_json::from_str(&raw).map_err(|e| StrategyError::Parse(e.to_string()))?;
        Self::from_specs(&specs)
    }

    pub fn with_context_weights(mut self, context: ContextWeights) -> Self {
        self.context = context;
        self
    }

    pub fn rules(&self) -> &[SignalRule] {
        &self.rules
    }

    pub fn context_weights(&self) -> ContextWeights {
        self.context
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
