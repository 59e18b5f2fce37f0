// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use smart_web_query::content::FetchError;
use smart_web_query::orchestrator::{AcquisitionError, RunOptions};
use smart_web_query::pipeline::{FetchMethod, PipelineConfig};
use smart_web_query::search::SearchError;
use smart_web_query::strategy::QueryLevel;
use smart_web_query::telemetry::TelemetrySink;
use std::sync::Arc;
use std::time::Duration;

use super::support::{
    article_page, orchestrator, orchestrator_with, pool, result, spa_shell, EngineCounters,
    FixtureProvider, Scripted, ScriptedFetcher, StubEngine,
};

const DOC_SENTENCE: &str = "The handshake exchanges SYN, SYN-ACK and ACK segments. ";

#[tokio::test]
async fn test_advanced_query_renders_every_page() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(ScriptedFetcher::default());
    let provider = FixtureProvider::new(vec![
        result(1, "https://weather.example.com/beijing"),
        result(2, "https://news.example.com/today"),
    ]);

    let orch = orchestrator(
        provider,
        Arc::clone(&fetcher),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
    );

    let outcome = orch.run("今天北京天气", RunOptions::default()).await.unwrap();

    let analysis = outcome.strategy_info.analysis.as_ref().unwrap();
    assert_eq!(analysis.level, QueryLevel::Advanced);
    assert!(outcome.strategy_info.effective_force_rendering);

    assert_eq!(outcome.fetched.len(), 2);
    assert!(outcome
        .fetched
        .iter()
        .all(|f| f.method == FetchMethod::Rendered));
    assert_eq!(outcome.method_stats.cheap, 0);
    assert_eq!(outcome.method_stats.rendered, 2);
    assert_eq!(fetcher.calls(), 0, "forced rendering skips the cheap fetch");
    assert_eq!(counters.navigations(), 2);
}

#[tokio::test]
async fn test_basic_query_tries_cheap_path_first() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with(
                "https://docs.example.com/tcp",
                Scripted::Html(article_page(DOC_SENTENCE)),
            )
            .with("https://app.example.com/tcp", Scripted::Html(spa_shell())),
    );
    let provider = FixtureProvider::new(vec![
        result(1, "https://docs.example.com/tcp"),
        result(2, "https://app.example.com/tcp"),
    ]);

    let orch = orchestrator(
        provider,
        Arc::clone(&fetcher),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
    );

    let outcome = orch.run("TCP三次握手原理", RunOptions::default()).await.unwrap();

    let analysis = outcome.strategy_info.analysis.as_ref().unwrap();
    assert_eq!(analysis.level, QueryLevel::Basic);
    assert!(!outcome.strategy_info.effective_force_rendering);

    assert_eq!(fetcher.calls(), 2, "every URL starts with a cheap fetch");
    assert_eq!(outcome.fetched[0].method, FetchMethod::Cheap);
    assert_eq!(outcome.fetched[1].method, FetchMethod::Rendered);
    assert_eq!(outcome.method_stats.cheap, 1);
    assert_eq!(outcome.method_stats.rendered, 1);
    assert_eq!(counters.navigations(), 1);
}

fn settling_pipeline() -> PipelineConfig {
    PipelineConfig {
        settle_delay: Duration::from_millis(200),
        dynamic_settle_extra: Duration::from_millis(800),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_basic_mode_escalation_still_settles() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(
        ScriptedFetcher::default().with("https://app.example.com/tcp", Scripted::Html(spa_shell())),
    );
    let provider = FixtureProvider::new(vec![result(1, "https://app.example.com/tcp")]);

    let orch = orchestrator_with(
        provider,
        Arc::clone(&fetcher),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
        settling_pipeline(),
    );

    let outcome = orch.run("TCP三次握手原理", RunOptions::default()).await.unwrap();

    assert_eq!(
        outcome.strategy_info.analysis.as_ref().unwrap().level,
        QueryLevel::Basic
    );
    assert_eq!(outcome.fetched[0].method, FetchMethod::Rendered);
    assert_eq!(counters.settle_delays(), vec![Duration::from_millis(200)]);
}

#[tokio::test]
async fn test_advanced_mode_extends_settle_delay() {
    let counters = Arc::new(EngineCounters::default());
    let provider = FixtureProvider::new(vec![
        result(1, "https://weather.example.com/beijing"),
        result(2, "https://news.example.com/today"),
    ]);

    let orch = orchestrator_with(
        provider,
        Arc::new(ScriptedFetcher::default()),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
        settling_pipeline(),
    );

    orch.run("今天北京天气", RunOptions::default()).await.unwrap();

    assert_eq!(counters.settle_delays(), vec![Duration::from_secs(1); 2]);
}

#[tokio::test]
async fn test_empty_search_returns_empty_result_without_touching_pool() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(ScriptedFetcher::default());

    let orch = orchestrator(
        FixtureProvider::new(Vec::new()),
        Arc::clone(&fetcher),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
    );

    let outcome = orch.run("今天北京天气", RunOptions::default()).await.unwrap();

    assert!(outcome.search_results.is_empty());
    assert!(outcome.fetched.is_empty());
    assert!(outcome.error.is_none());
    assert_eq!(outcome.method_stats.planned, 0);
    assert_eq!(outcome.method_stats.cheap, 0);
    assert_eq!(outcome.method_stats.rendered, 0);
    assert_eq!(outcome.method_stats.failed, 0);
    assert_eq!(counters.launched(), 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_unavailable_renderer_keeps_cheap_results() {
    let counters = Arc::new(EngineCounters::default());
    let mut engine = StubEngine::new(Arc::clone(&counters));
    engine.unavailable = true;

    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with(
                "https://docs.example.com/a",
                Scripted::Html(article_page(DOC_SENTENCE)),
            )
            .with("https://spa.example.com/b", Scripted::Html(spa_shell()))
            .with(
                "https://down.example.com/c",
                Scripted::Fail(FetchError::Timeout("https://down.example.com/c".to_string())),
            ),
    );
    let provider = FixtureProvider::new(vec![
        result(1, "https://docs.example.com/a"),
        result(2, "https://spa.example.com/b"),
        result(3, "https://down.example.com/c"),
    ]);

    let orch = orchestrator(
        provider,
        fetcher,
        pool(engine, 2),
        TelemetrySink::disabled(),
    );

    let outcome = orch.run("TCP三次握手原理", RunOptions::default()).await.unwrap();

    assert_eq!(outcome.fetched.len(), 3);
    assert!(outcome.fetched[0].succeeded);
    assert_eq!(outcome.fetched[0].method, FetchMethod::Cheap);

    for escalated in &outcome.fetched[1..] {
        assert!(!escalated.succeeded);
        assert_eq!(escalated.method, FetchMethod::Rendered);
        assert!(escalated.error.is_some());
    }
    assert!(outcome.fetched[2]
        .error
        .as_deref()
        .unwrap()
        .starts_with("cheap fetch failed"));

    assert_eq!(outcome.method_stats.cheap, 1);
    assert_eq!(outcome.method_stats.failed, 2);
    assert_eq!(outcome.content_sources, 1);
    assert!(outcome.sources[0].has_content);
    assert!(!outcome.sources[1].has_content);
}

#[tokio::test]
async fn test_sources_follow_search_rank_not_completion_order() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with(
                "https://slow.example.com/1",
                Scripted::Delayed(Duration::from_millis(80), article_page(DOC_SENTENCE)),
            )
            .with(
                "https://fast.example.com/2",
                Scripted::Html(article_page(DOC_SENTENCE)),
            ),
    );
    let provider = FixtureProvider::new(vec![
        result(1, "https://slow.example.com/1"),
        result(2, "https://fast.example.com/2"),
    ]);

    let orch = orchestrator(
        provider,
        fetcher,
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 2),
        TelemetrySink::disabled(),
    );

    let outcome = orch.run("TCP三次握手原理", RunOptions::default()).await.unwrap();

    let urls: Vec<&str> = outcome.sources.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://slow.example.com/1", "https://fast.example.com/2"]
    );
    assert_eq!(outcome.fetched[0].url, "https://slow.example.com/1");
    assert_eq!(outcome.sources[1].index, 2);
}

#[tokio::test]
async fn test_caller_overrides_beat_strategy() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with(
                "https://a.example.com/",
                Scripted::Html(article_page(DOC_SENTENCE)),
            )
            .with(
                "https://b.example.com/",
                Scripted::Html(article_page(DOC_SENTENCE)),
            ),
    );
    let provider = FixtureProvider::new(vec![
        result(1, "https://a.example.com/"),
        result(2, "https://b.example.com/"),
        result(3, "https://c.example.com/"),
    ]);

    let orch = orchestrator(
        provider,
        Arc::clone(&fetcher),
        pool(StubEngine::new(Arc::clone(&counters)), 2),
        TelemetrySink::disabled(),
    );

    // Advanced query, but the caller wants cheap fetches of two pages
    let options = RunOptions {
        force_rendering: Some(false),
        max_content_sources: Some(2),
        ..Default::default()
    };
    let outcome = orch.run("今天北京天气", options).await.unwrap();

    assert!(!outcome.strategy_info.effective_force_rendering);
    assert_eq!(outcome.strategy_info.effective_max_content_sources, 2);
    assert_eq!(outcome.method_stats.planned, 2);
    assert_eq!(outcome.method_stats.cheap, 2);
    assert_eq!(counters.launched(), 0);
}

#[tokio::test]
async fn test_inline_directive_is_stripped_before_search() {
    let provider = FixtureProvider::new(Vec::new());
    let queries = Arc::clone(&provider.queries);

    let orch = orchestrator(
        provider,
        Arc::new(ScriptedFetcher::default()),
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        TelemetrySink::disabled(),
    );

    let outcome = orch
        .run("今天北京天气 [[FORCE_BASIC]]", RunOptions::default())
        .await
        .unwrap();

    let analysis = outcome.strategy_info.analysis.as_ref().unwrap();
    assert_eq!(analysis.level, QueryLevel::ForcedBasic);
    assert_eq!(queries.lock().unwrap().as_slice(), ["今天北京天气"]);
}

#[tokio::test]
async fn test_missing_credentials_surface_as_configuration_error() {
    let orch = orchestrator(
        FixtureProvider::failing(SearchError::NoApiKey {
            provider: "google".to_string(),
        }),
        Arc::new(ScriptedFetcher::default()),
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        TelemetrySink::disabled(),
    );

    let err = orch.run("anything", RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, AcquisitionError::Configuration(_)));
}

#[tokio::test]
async fn test_transient_search_error_degrades_to_result() {
    let telemetry = TelemetrySink::in_memory();
    let orch = orchestrator(
        FixtureProvider::failing(SearchError::Timeout { timeout_ms: 30_000 }),
        Arc::new(ScriptedFetcher::default()),
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        telemetry.clone(),
    );

    let outcome = orch.run("anything", RunOptions::default()).await.unwrap();
    assert!(outcome.error.is_some());
    assert!(outcome.fetched.is_empty());

    let stages = telemetry.stages();
    assert_eq!(stages.first().map(String::as_str), Some("start"));
    assert!(stages.iter().any(|s| s == "error"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_partial_results() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with(
                "https://fast.example.com/",
                Scripted::Html(article_page(DOC_SENTENCE)),
            )
            .with(
                "https://slow.example.com/",
                Scripted::Delayed(Duration::from_secs(600), article_page(DOC_SENTENCE)),
            ),
    );
    let provider = FixtureProvider::new(vec![
        result(1, "https://fast.example.com/"),
        result(2, "https://slow.example.com/"),
    ]);

    let orch = orchestrator(
        provider,
        fetcher,
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        TelemetrySink::disabled(),
    );

    let options = RunOptions {
        deadline: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let outcome = orch.run("TCP三次握手原理", options).await.unwrap();

    assert!(outcome.deadline_exceeded);
    assert_eq!(outcome.method_stats.planned, 2);
    assert_eq!(outcome.method_stats.cheap, 1);
    assert_eq!(outcome.method_stats.timed_out, 1);
    assert_eq!(outcome.fetched.len(), 1);
    assert_eq!(outcome.content_sources, 1);
    assert!(!outcome.sources[1].has_content);
}

#[tokio::test]
async fn test_rendering_escalations_never_exceed_pool_capacity() {
    let counters = Arc::new(EngineCounters::default());
    let mut engine = StubEngine::new(Arc::clone(&counters));
    engine.navigation_delay = Duration::from_millis(30);

    let urls: Vec<String> = (1..=5)
        .map(|n| format!("https://spa{}.example.com/", n))
        .collect();
    let provider = FixtureProvider::new(
        urls.iter()
            .enumerate()
            .map(|(i, url)| result(i + 1, url))
            .collect(),
    );

    let orch = orchestrator(
        provider,
        Arc::new(ScriptedFetcher::default()),
        pool(engine, 2),
        TelemetrySink::disabled(),
    );

    let options = RunOptions {
        force_rendering: Some(true),
        max_content_sources: Some(5),
        ..Default::default()
    };
    let outcome = orch.run("TCP三次握手原理", options).await.unwrap();

    assert_eq!(outcome.method_stats.rendered, 5);
    assert!(counters.peak_in_flight() <= 2);
    assert!(counters.launched() <= 2);
}
