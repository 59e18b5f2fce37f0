// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use smart_web_query::browser::{NavigationOptions, PoolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::support::{pool, EngineCounters, StubEngine};

#[tokio::test]
async fn test_sequential_acquisitions_share_one_session() {
    let counters = Arc::new(EngineCounters::default());
    let pool = pool(StubEngine::new(Arc::clone(&counters)), 2);

    let first = pool.acquire_page("search").await.unwrap();
    let first_id = first.session_id().to_string();
    first.release().await;

    let second = pool.acquire_page("search").await.unwrap();
    assert_eq!(second.session_id(), first_id);
    second.release().await;

    let stats = pool.stats();
    assert_eq!(stats.active_sessions, 1);
    assert_eq!(stats.sessions[0].usage_count, 2);
    assert_eq!(counters.launched(), 1);
}

#[tokio::test]
async fn test_pages_render_through_leased_session() {
    let counters = Arc::new(EngineCounters::default());
    let engine = StubEngine::new(Arc::clone(&counters))
        .with_text("https://example.com/", "Hello from the rendered DOM");
    let pool = pool(engine, 1);

    let page = pool.acquire_page("default").await.unwrap();
    page.page()
        .navigate("https://example.com/", &NavigationOptions::default())
        .await
        .unwrap();
    let text = page.page().inner_text().await.unwrap();
    page.release().await;

    assert_eq!(text, "Hello from the rendered DOM");
    assert_eq!(pool.stats().busy_sessions, 0);
}

#[tokio::test]
async fn test_full_pool_queues_instead_of_growing() {
    let counters = Arc::new(EngineCounters::default());
    let pool = pool(StubEngine::new(Arc::clone(&counters)), 2);

    let a = pool.acquire_page("a").await.unwrap();
    let b = pool.acquire_page("b").await.unwrap();

    let blocked = timeout(Duration::from_millis(50), pool.acquire_page("c")).await;
    assert!(blocked.is_err(), "third acquisition must wait for a release");

    let stats = pool.stats();
    assert_eq!(stats.busy_sessions, 2);
    assert!(stats.active_sessions + stats.creating_sessions <= stats.max_sessions);

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let page = pool.acquire_page("c").await.unwrap();
            let id = page.session_id().to_string();
            page.release().await;
            id
        })
    };

    a.release().await;
    let id = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be admitted after a release")
        .unwrap();
    assert!(!id.is_empty());

    b.release().await;
    assert!(pool.stats().active_sessions <= 2);
    assert!(counters.launched() <= 3);
}

#[tokio::test]
async fn test_cancelled_wait_does_not_consume_capacity() {
    let pool = pool(StubEngine::new(Arc::new(EngineCounters::default())), 1);

    let held = pool.acquire_page("k").await.unwrap();
    for _ in 0..3 {
        let _ = timeout(Duration::from_millis(10), pool.acquire_page("k")).await;
    }
    held.release().await;

    let again = timeout(Duration::from_secs(1), pool.acquire_page("k"))
        .await
        .expect("capacity must be available after cancelled waits")
        .unwrap();
    again.release().await;
    assert_eq!(pool.stats().active_sessions, 1);
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let counters = Arc::new(EngineCounters::default());
    let pool = pool(StubEngine::new(Arc::clone(&counters)), 2);
    pool.start();

    let page = pool.acquire_page("x").await.unwrap();
    page.release().await;
    let page = pool.acquire_page("y").await.unwrap();
    page.release().await;

    pool.shutdown().await;

    assert_eq!(counters.closed(), counters.launched());
    assert_eq!(pool.stats().active_sessions, 0);
    assert!(matches!(
        pool.acquire_page("x").await,
        Err(PoolError::ShutDown)
    ));
}

#[tokio::test]
async fn test_launch_failure_is_reported_and_pool_stays_usable() {
    let counters = Arc::new(EngineCounters::default());
    let mut engine = StubEngine::new(Arc::clone(&counters));
    engine.unavailable = true;
    let pool = pool(engine, 1);

    for _ in 0..2 {
        let result = pool.acquire_page("k").await;
        assert!(matches!(result, Err(PoolError::Launch(_))));
    }

    let stats = pool.stats();
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.creating_sessions, 0);
}
