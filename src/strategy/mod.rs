// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query strategy selection
//!
//! Decides per query whether pages should be fetched cheaply first or
//! rendered straight away, and how many sources to fetch.

pub mod classifier;
pub mod rules;

pub use classifier::{
    strip_directives, QueryAnalysis, QueryClassifier, QueryContext, QueryLevel, StrategyConfig,
};
pub use rules::{ContextWeights, RuleKind, RuleSet, RuleSpec, SignalCategory, SignalRule, StrategyError};
