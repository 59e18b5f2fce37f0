// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML content extraction
//!
//! Turns raw markup into cleaned, length-capped text and flags pages that
//! probably need JavaScript rendering to show their real content.

use scraper::{ElementRef, Html, Selector};

use super::config::ContentFetchConfig;

/// Subtrees never contributing text
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "footer", "header", "aside",
];

/// Main-content regions, in preference order
const REGION_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    ".content",
    ".main-content",
    ".post-content",
    ".article-content",
    ".entry-content",
    "#content",
    "#main",
];

/// Markup fragments left behind by single-page-app frameworks
const SPA_MARKERS: &[&str] = &[
    "ng-app",         // Angular
    "data-reactroot", // React
    "id=\"app\"",     // Vue
    "__NEXT_DATA__",  // Next.js
    "nuxt",           // Nuxt
];

/// Result of extracting text from one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub is_dynamic_content_suspected: bool,
}

/// Text extractor with dynamic-content detection
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    max_chars: usize,
    min_text_chars: usize,
    max_empty_containers: usize,
    regions: Vec<Selector>,
    body: Option<Selector>,
    containers: Option<Selector>,
}

impl ContentExtractor {
    pub fn new(config: &ContentFetchConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            min_text_chars: config.min_text_chars,
            max_empty_containers: config.max_empty_containers,
            regions: REGION_SELECTORS
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect(),
            body: Selector::parse("body").ok(),
            containers: Selector::parse("div").ok(),
        }
    }

    /// Maximum characters of text this extractor returns
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Extract cleaned text and the dynamic-content signal from raw HTML
    ///
    /// Malformed markup never fails; at worst the text is empty.
    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        let text = self.extract_text(&document);

        let is_dynamic_content_suspected = has_spa_marker(html)
            || text.chars().count() < self.min_text_chars
            || self.count_empty_containers(&document) > self.max_empty_containers;

        Extraction {
            text,
            is_dynamic_content_suspected,
        }
    }

    fn extract_text(&self, document: &Html) -> String {
        for selector in &self.regions {
            if let Some(region) = document.select(selector).next() {
                let cleaned = clean_text(&element_text(region));
                if !cleaned.is_empty() {
                    return truncate_chars(&cleaned, self.max_chars);
                }
            }
        }

        let root = self
            .body
            .as_ref()
            .and_then(|s| document.select(s).next())
            .unwrap_or_else(|| document.root_element());

        truncate_chars(&clean_text(&element_text(root)), self.max_chars)
    }

    fn count_empty_containers(&self, document: &Html) -> usize {
        let Some(containers) = &self.containers else {
            return 0;
        };
        document
            .select(containers)
            .filter(|div| div.text().all(|t| t.trim().is_empty()))
            .count()
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(&ContentFetchConfig::default())
    }
}

/// Extract the document title, if any
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn has_spa_marker(html: &str) -> bool {
    SPA_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Text of an element, skipping excluded subtrees
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !EXCLUDED_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}

/// Clean text: normalize whitespace
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap text at `max_chars` characters without splitting a character
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
