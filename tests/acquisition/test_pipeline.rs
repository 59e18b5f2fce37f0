// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use smart_web_query::content::{ContentExtractor, FetchError};
use smart_web_query::pipeline::{
    CheapOutcome, EscalationReason, FetchMethod, HybridFetcher, PipelineConfig,
};
use smart_web_query::telemetry::{TelemetryConfig, TelemetrySink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use super::support::{
    article_page, hybrid, pool, spa_shell, EngineCounters, Scripted, ScriptedFetcher, StubEngine,
};

const SENTENCE: &str = "Static documentation content that needs no scripts to read. ";

#[tokio::test]
async fn test_static_page_never_reaches_pool() {
    let counters = Arc::new(EngineCounters::default());
    let fetcher = Arc::new(ScriptedFetcher::default().with(
        "https://docs.example.com/",
        Scripted::Html(article_page(SENTENCE)),
    ));
    let hybrid = hybrid(
        fetcher,
        pool(StubEngine::new(Arc::clone(&counters)), 1),
        TelemetrySink::disabled(),
    );

    let result = hybrid.fetch("https://docs.example.com/", false).await;

    assert!(result.succeeded);
    assert_eq!(result.method, FetchMethod::Cheap);
    assert!(result.extracted_text.chars().count() > 100);
    assert!(!result.extracted_text.contains("Menu"));
    assert_eq!(counters.launched(), 0);
}

#[tokio::test]
async fn test_cheap_stage_reports_why_it_fell_short() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with("https://spa.example.com/", Scripted::Html(spa_shell()))
            .with(
                "https://down.example.com/",
                Scripted::Fail(FetchError::Http("connection reset".to_string())),
            ),
    );
    let hybrid = hybrid(
        fetcher,
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        TelemetrySink::disabled(),
    );

    match hybrid.cheap_stage("https://spa.example.com/", Instant::now()).await {
        CheapOutcome::Insufficient { partial, reason } => {
            assert_eq!(reason, EscalationReason::DynamicContent);
            assert!(partial.unwrap().is_dynamic_content_suspected);
        }
        other => panic!("expected escalation, got {:?}", other),
    }

    match hybrid.cheap_stage("https://down.example.com/", Instant::now()).await {
        CheapOutcome::Insufficient { partial, reason } => {
            assert!(partial.is_none());
            assert!(matches!(reason, EscalationReason::CheapFailed { .. }));
        }
        other => panic!("expected escalation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dynamic_page_is_rendered() {
    let counters = Arc::new(EngineCounters::default());
    let engine = StubEngine::new(Arc::clone(&counters))
        .with_text("https://spa.example.com/", "  Client side rendered dashboard  ");
    let fetcher = Arc::new(
        ScriptedFetcher::default().with("https://spa.example.com/", Scripted::Html(spa_shell())),
    );
    let telemetry = TelemetrySink::in_memory();
    let hybrid = hybrid(fetcher, pool(engine, 1), telemetry.clone());

    let result = hybrid.fetch("https://spa.example.com/", false).await;

    assert!(result.succeeded);
    assert_eq!(result.method, FetchMethod::Rendered);
    assert_eq!(result.extracted_text, "Client side rendered dashboard");
    assert!(result.is_dynamic_content_suspected);

    let stages = telemetry.stages();
    assert_eq!(
        stages,
        vec!["fetch_start", "fallback_to_rendering", "fetch_success"]
    );
    assert_eq!(hybrid.pool().stats().busy_sessions, 0);
}

#[tokio::test]
async fn test_busy_pool_degrades_to_timed_out_result() {
    let counters = Arc::new(EngineCounters::default());
    let pool = pool(StubEngine::new(Arc::clone(&counters)), 1);
    let hybrid = HybridFetcher::new(
        Arc::new(ScriptedFetcher::default()),
        ContentExtractor::default(),
        Arc::clone(&pool),
        PipelineConfig {
            render_timeout: Duration::from_millis(100),
            navigation_timeout: Duration::from_millis(50),
            settle_delay: Duration::ZERO,
            ..Default::default()
        },
        TelemetrySink::disabled(),
    );

    let held = pool.acquire_page("default").await.unwrap();
    let result = hybrid.fetch("https://example.com/", true).await;
    held.release().await;

    assert!(!result.succeeded);
    assert_eq!(result.method, FetchMethod::Rendered);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(pool.stats().busy_sessions, 0);
}

#[tokio::test]
async fn test_events_are_written_as_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tools.log");
    let config = TelemetryConfig {
        enabled: true,
        path: path.clone(),
        ..Default::default()
    };
    let telemetry = TelemetrySink::from_config(&config);

    let fetcher = Arc::new(ScriptedFetcher::default().with(
        "https://docs.example.com/",
        Scripted::Html(article_page(SENTENCE)),
    ));
    let hybrid = hybrid(
        fetcher,
        pool(StubEngine::new(Arc::new(EngineCounters::default())), 1),
        telemetry.clone(),
    );

    hybrid.fetch("https://docs.example.com/", false).await;
    telemetry.flush().await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["stage"], "fetch_start");
    assert_eq!(events[1]["stage"], "fetch_success");
    assert_eq!(events[1]["method"], "cheap");
    for event in &events {
        assert!(event.get("tool").is_some());
        assert!(event.get("ts").is_some());
        assert_eq!(event["ok"], true);
    }
}
