// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search providers
//!
//! The search provider is an external collaborator of the acquisition
//! engine: given a query and a count it returns ranked `{title, url, snippet}`
//! items. Key features:
//! - Google Custom Search and Bing Web Search providers
//! - Priority-ordered failover between configured providers
//! - Local rate limiting
//! - Missing credentials reported as a configuration error

pub mod bing;
pub mod config;
pub mod google;
pub mod provider;
pub mod rate_limiter;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::SearchConfig;
pub use provider::{rank_hits, RawHit, SearchProvider};
pub use service::SearchService;
pub use types::{is_valid_url, SearchError, SearchResponse, SearchResult};
