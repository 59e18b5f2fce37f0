// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process rendering engine for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{NavigationOptions, RenderError, RenderPage, RenderSession, RenderingEngine};

#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub settle_delays: Mutex<Vec<Duration>>,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn settle_delays(&self) -> Vec<Duration> {
        self.settle_delays.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct FakeEngine {
    pub counters: Arc<Counters>,
    pub fail_launch: bool,
    pub fail_page: bool,
    pub fail_navigation: bool,
    pub launch_delay: Duration,
    pub page_text: String,
}

impl FakeEngine {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self {
            counters,
            fail_launch: false,
            fail_page: false,
            fail_navigation: false,
            launch_delay: Duration::ZERO,
            page_text: "Rendered page text".to_string(),
        }
    }
}

#[async_trait]
impl RenderingEngine for FakeEngine {
    async fn launch(&self) -> Result<Arc<dyn RenderSession>, RenderError> {
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        if self.fail_launch {
            return Err(RenderError::Unavailable("browser not installed".to_string()));
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSession {
            engine: self.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeSession {
    engine: FakeEngine,
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        if self.engine.fail_page {
            return Err(RenderError::Page("target crashed".to_string()));
        }
        self.engine
            .counters
            .pages_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            engine: self.engine.clone(),
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.engine.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    engine: FakeEngine,
}

#[async_trait]
impl RenderPage for FakePage {
    async fn navigate(&self, url: &str, options: &NavigationOptions) -> Result<(), RenderError> {
        self.engine
            .counters
            .navigations
            .fetch_add(1, Ordering::SeqCst);
        self.engine
            .counters
            .settle_delays
            .lock()
            .unwrap()
            .push(options.settle_delay);
        if self.engine.fail_navigation {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, RenderError> {
        Ok(self.engine.page_text.clone())
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.engine
            .counters
            .pages_closed
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
