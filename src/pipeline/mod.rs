// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-URL acquisition: cheap fetch, sufficiency check, rendering escalation

pub mod config;
pub mod hybrid;

pub use config::PipelineConfig;
pub use hybrid::{CheapOutcome, EscalationReason, FetchMethod, FetchOptions, FetchResult, HybridFetcher};
