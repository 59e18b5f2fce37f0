// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Headless Chromium rendering engine
//!
//! Each session is a separate browser process with its own throwaway
//! profile directory, driven over CDP by chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::BrowserLaunchConfig;
use super::engine::{NavigationOptions, RenderError, RenderPage, RenderSession, RenderingEngine};

const BROWSER_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-default-apps",
    "--no-first-run",
    "--disable-background-timer-throttling",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
];

/// Locate a Chrome or Chromium binary
///
/// Checks the `CHROME` environment variable, then well-known binary names
/// on `PATH`, then platform install locations.
pub fn detect_chrome() -> Result<PathBuf, RenderError> {
    let mut checked: Vec<PathBuf> = Vec::new();

    if let Ok(chrome) = std::env::var("CHROME") {
        let path = PathBuf::from(chrome);
        if path.exists() {
            return Ok(path);
        }
        checked.push(path);
    }

    for binary in [
        "chrome",
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(binary) {
            if path.exists() {
                return Ok(path);
            }
            checked.push(path);
        }
    }

    for path in standard_chrome_paths() {
        if path.exists() {
            return Ok(path);
        }
        checked.push(path);
    }

    Err(RenderError::Unavailable(format!(
        "Chrome/Chromium not found (checked {} locations: {})",
        checked.len(),
        checked
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

fn standard_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Vec::new()
    }
}

/// chromiumoxide-backed rendering engine
pub struct ChromiumEngine {
    config: BrowserLaunchConfig,
}

impl ChromiumEngine {
    pub fn new(config: BrowserLaunchConfig) -> Self {
        Self { config }
    }

    fn resolve_executable(&self) -> Result<PathBuf, RenderError> {
        match &self.config.chrome_executable {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(RenderError::Unavailable(format!(
                "configured browser binary does not exist: {}",
                path.display()
            ))),
            None => detect_chrome(),
        }
    }

    /// Whether a browser binary can be found
    pub fn is_available(&self) -> bool {
        self.resolve_executable().is_ok()
    }

    /// Page emulation size; the window size alone leaves pages at 800x600
    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.config.viewport_width,
            height: self.config.viewport_height,
            device_scale_factor: Some(1.0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl RenderingEngine for ChromiumEngine {
    async fn launch(&self) -> Result<Arc<dyn RenderSession>, RenderError> {
        let executable = self.resolve_executable()?;
        let user_data_dir =
            std::env::temp_dir().join(format!("smart-web-query-{}", Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(&user_data_dir)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .viewport(Some(self.viewport()))
            .args(BROWSER_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.config.user_agent));

        if !self.config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the
        // lifetime of the browser.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    if message.contains("did not match any variant") {
                        continue;
                    }
                    debug!("CDP handler error: {}", message);
                    if message.contains("connection closed") || message.contains("websocket") {
                        break;
                    }
                }
            }
            debug!("CDP handler task finished");
        });

        info!(
            "Launched browser session ({}, {}x{})",
            executable.display(),
            self.config.viewport_width,
            self.config.viewport_height
        );

        Ok(Arc::new(ChromiumSession {
            browser: Mutex::new(browser),
            handler_task,
            user_data_dir,
        }))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

struct ChromiumSession {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        let result = {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| RenderError::Close(e.to_string()))
        };

        self.handler_task.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            debug!(
                "Could not remove profile dir {}: {}",
                self.user_data_dir.display(),
                e
            );
        }

        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn navigate(&self, url: &str, options: &NavigationOptions) -> Result<(), RenderError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok::<(), RenderError>(())
        };

        tokio::time::timeout(options.timeout, navigation)
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            })??;

        if !options.settle_delay.is_zero() {
            tokio::time::sleep(options.settle_delay).await;
        }

        Ok(())
    }

    async fn inner_text(&self) -> Result<String, RenderError> {
        self.page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| RenderError::Extraction(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::Extraction(e.to_string()))
    }

    async fn close(&self) -> Result<(), RenderError> {
        if let Err(e) = self.page.clone().close().await {
            warn!("Page close failed: {}", e);
            return Err(RenderError::Close(e.to_string()));
        }
        Ok(())
    }
}
