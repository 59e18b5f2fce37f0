// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fakes for the acquisition integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use smart_web_query::browser::{
    NavigationOptions, PoolConfig, RenderError, RenderPage, RenderSession, RenderingEngine,
    SessionPool,
};
use smart_web_query::content::{ContentExtractor, FetchError, PageFetcher};
use smart_web_query::orchestrator::{OrchestratorConfig, QueryOrchestrator};
use smart_web_query::pipeline::{HybridFetcher, PipelineConfig};
use smart_web_query::search::{
    SearchConfig, SearchError, SearchProvider, SearchResult, SearchService,
};
use smart_web_query::strategy::QueryClassifier;
use smart_web_query::telemetry::TelemetrySink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn article_page(sentence: &str) -> String {
    format!(
        "<html><head><title>Doc</title></head><body><nav>Menu</nav><article><p>{}</p></article></body></html>",
        sentence.repeat(8)
    )
}

pub fn spa_shell() -> String {
    r#"<html><head><script src="/bundle.js"></script></head><body><div id="root"></div></body></html>"#
        .to_string()
}

pub fn result(rank: usize, url: &str) -> SearchResult {
    SearchResult {
        title: format!("Result {}", rank),
        url: url.to_string(),
        snippet: format!("Snippet for result {}", rank),
        published_date: None,
        source: "fixture".to_string(),
    }
}

/// Search provider returning a fixed list
pub struct FixtureProvider {
    pub results: Vec<SearchResult>,
    pub error: Option<SearchError>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl FixtureProvider {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            error: None,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SearchProvider for FixtureProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.results.iter().take(num_results).cloned().collect()),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// What the cheap fetcher does for one URL
#[derive(Clone)]
pub enum Scripted {
    Html(String),
    Fail(FetchError),
    Delayed(Duration, String),
}

/// Cheap fetcher answering from a URL table
#[derive(Default)]
pub struct ScriptedFetcher {
    pub pages: HashMap<String, Scripted>,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn with(mut self, url: &str, behaviour: Scripted) -> Self {
        self.pages.insert(url.to_string(), behaviour);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Scripted::Html(html)) => Ok(html.clone()),
            Some(Scripted::Fail(e)) => Err(e.clone()),
            Some(Scripted::Delayed(delay, html)) => {
                tokio::time::sleep(*delay).await;
                Ok(html.clone())
            }
            None => Err(FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct EngineCounters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub settle_delays: Mutex<Vec<Duration>>,
}

impl EngineCounters {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Settle delay each navigation was asked to apply, in call order
    pub fn settle_delays(&self) -> Vec<Duration> {
        self.settle_delays.lock().unwrap().clone()
    }
}

/// Browser stand-in: every page renders `texts[url]` or a default body
#[derive(Clone)]
pub struct StubEngine {
    pub counters: Arc<EngineCounters>,
    pub texts: Arc<HashMap<String, String>>,
    pub navigation_delay: Duration,
    pub unavailable: bool,
}

impl StubEngine {
    pub fn new(counters: Arc<EngineCounters>) -> Self {
        Self {
            counters,
            texts: Arc::new(HashMap::new()),
            navigation_delay: Duration::ZERO,
            unavailable: false,
        }
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        Arc::make_mut(&mut self.texts).insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl RenderingEngine for StubEngine {
    async fn launch(&self) -> Result<Arc<dyn RenderSession>, RenderError> {
        if self.unavailable {
            return Err(RenderError::Unavailable("no chrome binary".to_string()));
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubSession {
            engine: self.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct StubSession {
    engine: StubEngine,
}

#[async_trait]
impl RenderSession for StubSession {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        Ok(Box::new(StubPage {
            engine: self.engine.clone(),
            url: Mutex::new(String::new()),
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.engine.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubPage {
    engine: StubEngine,
    url: Mutex<String>,
}

#[async_trait]
impl RenderPage for StubPage {
    async fn navigate(&self, url: &str, options: &NavigationOptions) -> Result<(), RenderError> {
        let counters = &self.engine.counters;
        counters.navigations.fetch_add(1, Ordering::SeqCst);
        counters.settle_delays.lock().unwrap().push(options.settle_delay);
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.engine.navigation_delay.is_zero() {
            tokio::time::sleep(self.engine.navigation_delay).await;
        }
        counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, RenderError> {
        let url = self.url.lock().unwrap().clone();
        Ok(self
            .engine
            .texts
            .get(&url)
            .cloned()
            .unwrap_or_else(|| format!("Rendered content of {}", url)))
    }

    async fn close(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        settle_delay: Duration::ZERO,
        dynamic_settle_extra: Duration::ZERO,
        ..Default::default()
    }
}

pub fn pool(engine: StubEngine, max_sessions: usize) -> Arc<SessionPool> {
    Arc::new(SessionPool::new(
        Arc::new(engine),
        PoolConfig {
            max_sessions,
            ..Default::default()
        },
    ))
}

pub fn hybrid(
    fetcher: Arc<ScriptedFetcher>,
    pool: Arc<SessionPool>,
    telemetry: TelemetrySink,
) -> HybridFetcher {
    hybrid_with(fetcher, pool, telemetry, fast_pipeline_config())
}

pub fn hybrid_with(
    fetcher: Arc<ScriptedFetcher>,
    pool: Arc<SessionPool>,
    telemetry: TelemetrySink,
    config: PipelineConfig,
) -> HybridFetcher {
    HybridFetcher::new(fetcher, ContentExtractor::default(), pool, config, telemetry)
}

pub fn orchestrator(
    provider: FixtureProvider,
    fetcher: Arc<ScriptedFetcher>,
    pool: Arc<SessionPool>,
    telemetry: TelemetrySink,
) -> QueryOrchestrator {
    orchestrator_with(provider, fetcher, pool, telemetry, fast_pipeline_config())
}

pub fn orchestrator_with(
    provider: FixtureProvider,
    fetcher: Arc<ScriptedFetcher>,
    pool: Arc<SessionPool>,
    telemetry: TelemetrySink,
    pipeline: PipelineConfig,
) -> QueryOrchestrator {
    let search =
        SearchService::with_providers(vec![Box::new(provider)], SearchConfig::default()).unwrap();
    QueryOrchestrator::new(
        search,
        QueryClassifier::default(),
        hybrid_with(fetcher, pool, telemetry.clone(), pipeline),
        OrchestratorConfig::default(),
        telemetry,
    )
}
