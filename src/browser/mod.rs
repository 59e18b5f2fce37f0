// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Headless rendering
//!
//! - `engine`: traits for rendering engines, sessions and pages
//! - `chromium`: chromiumoxide implementation
//! - `pool`: bounded, keyed session pool with a background reaper

pub mod chromium;
pub mod config;
pub mod engine;
pub mod pool;
#[cfg(test)]
pub(crate) mod testing;

pub use chromium::{detect_chrome, ChromiumEngine};
pub use config::{BrowserLaunchConfig, PoolConfig};
pub use engine::{NavigationOptions, RenderError, RenderPage, RenderSession, RenderingEngine};
pub use pool::{PoolError, PoolStats, ScopedPage, SessionPool, SessionSnapshot};
