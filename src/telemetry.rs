// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tool telemetry sink
//!
//! Appends one JSON object per line (`{tool, stage, ok, ts, ...}`) to a log
//! file. Emitters push onto an unbounded channel and a background task does
//! the I/O, so recording an event never blocks and never fails the caller.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub const DEFAULT_TOOL_NAME: &str = "smart_web_query";
pub const DEFAULT_LOG_PATH: &str = "logs/agent/tools.log";

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub tool_name: String,
}

impl TelemetryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env::var("TELEMETRY_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            path: env::var("TELEMETRY_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            tool_name: defaults.tool_name,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.path.as_os_str().is_empty() {
            return Err("telemetry path must not be empty when enabled".to_string());
        }
        if self.tool_name.trim().is_empty() {
            return Err("tool_name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_LOG_PATH),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
        }
    }
}

/// One structured stage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub tool: String,
    pub stage: String,
    pub ok: bool,
    pub ts: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn new(tool: &str, stage: &str, ok: bool, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("detail".to_string(), other);
                map
            }
        };

        Self {
            tool: tool.to_string(),
            stage: stage.to_string(),
            ok,
            ts: Utc::now().to_rfc3339(),
            fields,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

enum WriterMessage {
    Event(TelemetryEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
enum Target {
    Disabled,
    File(mpsc::UnboundedSender<WriterMessage>),
    Memory(Arc<Mutex<Vec<TelemetryEvent>>>),
}

/// Fire-and-forget structured event sink
#[derive(Clone)]
pub struct TelemetrySink {
    tool: String,
    target: Target,
}

impl TelemetrySink {
    /// A sink that drops every event
    pub fn disabled() -> Self {
        Self {
            tool: DEFAULT_TOOL_NAME.to_string(),
            target: Target::Disabled,
        }
    }

    /// A sink that keeps events in memory, for inspection in tests
    pub fn in_memory() -> Self {
        Self {
            tool: DEFAULT_TOOL_NAME.to_string(),
            target: Target::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// A sink appending JSON lines to `path`
    ///
    /// Creates the parent directory. Must be called inside a Tokio runtime.
    pub fn to_file(path: impl AsRef<Path>, tool: &str) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path, rx));

        Ok(Self {
            tool: tool.to_string(),
            target: Target::File(tx),
        })
    }

    /// Build a sink from configuration, falling back to a disabled sink
    pub fn from_config(config: &TelemetryConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match Self::to_file(&config.path, &config.tool_name) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(
                    "Telemetry disabled, cannot prepare {}: {}",
                    config.path.display(),
                    e
                );
                Self::disabled()
            }
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Record a stage event; `fields` should be a JSON object
    pub fn record(&self, stage: &str, ok: bool, fields: Value) {
        match &self.target {
            Target::Disabled => {}
            Target::File(tx) => {
                let event = TelemetryEvent::new(&self.tool, stage, ok, fields);
                if tx.send(WriterMessage::Event(event)).is_err() {
                    debug!("Telemetry writer gone, dropping '{}' event", stage);
                }
            }
            Target::Memory(events) => {
                let event = TelemetryEvent::new(&self.tool, stage, ok, fields);
                events
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(event);
            }
        }
    }

    /// Wait until every event recorded so far has reached the file
    pub async fn flush(&self) {
        if let Target::File(tx) = &self.target {
            let (done_tx, done_rx) = oneshot::channel();
            if tx.send(WriterMessage::Flush(done_tx)).is_ok() {
                let _ = done_rx.await;
            }
        }
    }

    /// Events captured by an in-memory sink
    pub fn events(&self) -> Vec<TelemetryEvent> {
        match &self.target {
            Target::Memory(events) => events.lock().unwrap_or_else(|p| p.into_inner()).clone(),
            _ => Vec::new(),
        }
    }

    /// Stages captured by an in-memory sink, in order
    pub fn stages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.stage).collect()
    }
}

impl std::fmt::Debug for TelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match &self.target {
            Target::Disabled => "disabled",
            Target::File(_) => "file",
            Target::Memory(_) => "memory",
        };
        f.debug_struct("TelemetrySink")
            .field("tool", &self.tool)
            .field("target", &target)
            .finish()
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("Cannot open telemetry log {}: {}", path.display(), e);
            None
        }
    };

    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Event(event) => {
                let Some(file) = file.as_mut() else {
                    continue;
                };
                let mut line = match serde_json::to_string(&event) {
                    Ok(line) => line,
                    Err(e) => {
                        debug!("Unserializable telemetry event: {}", e);
                        continue;
                    }
                };
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!("Telemetry write failed: {}", e);
                }
            }
            WriterMessage::Flush(done) => {
                if let Some(file) = file.as_mut() {
                    if let Err(e) = file.flush().await {
                        warn!("Telemetry flush failed: {}", e);
                    }
                }
                let _ = done.send(());
            }
        }
    }
}
