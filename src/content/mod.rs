// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page content acquisition primitives
//!
//! - `fetcher`: cheap HTTP fetching behind the `PageFetcher` trait
//! - `charset`: body decoding that honours `<meta charset>` declarations
//! - `extractor`: main-content text extraction and dynamic-page detection

pub mod charset;
pub mod config;
pub mod extractor;
pub mod fetcher;

pub use config::ContentFetchConfig;
pub use extractor::{extract_title, ContentExtractor, Extraction};
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
