// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendering session pool
//!
//! Owns a bounded set of expensive rendering sessions and hands out exclusive
//! pages. Sessions are keyed so callers with the same key recycle the same
//! browser, but a busy session is never shared, reused or evicted.
//!
//! Admission is a semaphore with `max_sessions` permits. Every busy or
//! launching session holds one permit, so callers queue when everything is
//! busy. The session table sits behind one `std::sync::Mutex` and is never
//! held across an `.await`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::PoolConfig;
use super::engine::{RenderError, RenderPage, RenderSession, RenderingEngine};

/// Pool error types
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    #[error("Rendering session pool is shut down")]
    ShutDown,

    #[error("Failed to launch rendering session: {0}")]
    Launch(RenderError),

    #[error("Failed to open page in session {session_id}: {source}")]
    Page {
        session_id: String,
        source: RenderError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Creating,
    Idle,
    Busy,
}

struct SessionSlot {
    key: String,
    state: SlotState,
    session: Option<Arc<dyn RenderSession>>,
    created_at: Instant,
    last_used_at: Instant,
    usage_count: u64,
}

impl SessionSlot {
    fn is_idle(&self) -> bool {
        self.state == SlotState::Idle
    }
}

/// Point-in-time view of one live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub key: String,
    pub age_secs: u64,
    pub idle_secs: u64,
    pub usage_count: u64,
    pub busy: bool,
}

/// Pool statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    /// Launched sessions, busy or idle
    pub active_sessions: usize,
    pub busy_sessions: usize,
    pub idle_sessions: usize,
    /// Sessions whose launch is still in flight
    pub creating_sessions: usize,
    pub max_sessions: usize,
    pub sessions: Vec<SessionSnapshot>,
}

struct PoolShared {
    sessions: Mutex<HashMap<String, SessionSlot>>,
    permits: Arc<Semaphore>,
    config: PoolConfig,
}

impl PoolShared {
    fn table(&self) -> MutexGuard<'_, HashMap<String, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return a busy session to idle
    fn mark_idle(&self, id: &str) {
        let mut sessions = self.table();
        if let Some(slot) = sessions.get_mut(id) {
            if slot.state == SlotState::Busy {
                slot.state = SlotState::Idle;
                slot.last_used_at = Instant::now();
            }
        }
    }

    /// Remove idle sessions past their idle or absolute age limit
    fn take_expired(&self, now: Instant) -> Vec<(String, Arc<dyn RenderSession>)> {
        let timeout = self.config.session_timeout;
        let max_age = timeout * 2;
        let mut sessions = self.table();

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, slot)| {
                slot.is_idle()
                    && (now.duration_since(slot.last_used_at) > timeout
                        || now.duration_since(slot.created_at) > max_age)
            })
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                let slot = sessions.remove(&id)?;
                slot.session.map(|s| (id, s))
            })
            .collect()
    }

    fn drain(&self) -> Vec<(String, Arc<dyn RenderSession>)> {
        self.table()
            .drain()
            .filter_map(|(id, slot)| slot.session.map(|s| (id, s)))
            .collect()
    }
}

/// Close sessions off the caller's task so cancellation cannot skip it
fn close_detached(sessions: Vec<(String, Arc<dyn RenderSession>)>) {
    for (id, session) in sessions {
        tokio::spawn(async move {
            if let Err(e) = session.close().await {
                warn!("Failed to close rendering session {}: {}", id, e);
            } else {
                debug!("Closed rendering session {}", id);
            }
        });
    }
}

/// Removes a `Creating` placeholder unless the launch completed
struct CreatingGuard {
    shared: Arc<PoolShared>,
    id: String,
    armed: bool,
}

impl Drop for CreatingGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut sessions = self.shared.table();
            if matches!(sessions.get(&self.id), Some(slot) if slot.state == SlotState::Creating) {
                sessions.remove(&self.id);
            }
        }
    }
}

/// Exclusive claim on a busy session; dropping it returns the session to idle
struct Lease {
    shared: Arc<PoolShared>,
    id: String,
    _permit: OwnedSemaphorePermit,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.shared.mark_idle(&self.id);
    }
}

/// An exclusive page on a pooled session
///
/// Call [`ScopedPage::release`] to close the page before the session goes
/// back to idle. Dropping it also releases the session, closing the page in
/// the background.
pub struct ScopedPage {
    page: Arc<dyn RenderPage>,
    lease: Lease,
    closed: bool,
}

impl ScopedPage {
    fn new(page: Box<dyn RenderPage>, lease: Lease) -> Self {
        Self {
            page: Arc::from(page),
            lease,
            closed: false,
        }
    }

    pub fn page(&self) -> &dyn RenderPage {
        self.page.as_ref()
    }

    pub fn session_id(&self) -> &str {
        &self.lease.id
    }

    /// Close the page, then return the session to idle
    pub async fn release(mut self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to close page in session {}: {}", self.lease.id, e);
        }
        self.closed = true;
    }
}

impl Drop for ScopedPage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = Arc::clone(&self.page);
            let id = self.lease.id.clone();
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    debug!("Background page close failed in session {}: {}", id, e);
                }
            });
        }
    }
}

/// Bounded pool of rendering sessions
pub struct SessionPool {
    engine: Arc<dyn RenderingEngine>,
    shared: Arc<PoolShared>,
    cancel: CancellationToken,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionPool {
    pub fn new(engine: Arc<dyn RenderingEngine>, config: PoolConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_sessions.max(1)));
        Self {
            engine,
            shared: Arc::new(PoolShared {
                sessions: Mutex::new(HashMap::new()),
                permits,
                config,
            }),
            cancel: CancellationToken::new(),
            reaper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Start the background reaper; later calls are no-ops
    pub fn start(&self) {
        let mut reaper = self.reaper.lock().unwrap_or_else(|p| p.into_inner());
        if reaper.is_some() || self.cancel.is_cancelled() {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let period = shared.config.cleanup_interval;

        *reaper = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let expired = shared.take_expired(Instant::now());
                        if !expired.is_empty() {
                            info!("Reaper evicting {} expired rendering session(s)", expired.len());
                            close_detached(expired);
                        }
                    }
                }
            }
            debug!("Session reaper stopped");
        }));

        info!(
            "Session pool started (max {} sessions, timeout {:?})",
            self.shared.config.max_sessions, self.shared.config.session_timeout
        );
    }

    /// Evict expired idle sessions now; returns how many were evicted
    pub fn evict_expired(&self) -> usize {
        let expired = self.shared.take_expired(Instant::now());
        let count = expired.len();
        close_detached(expired);
        count
    }

    /// Acquire an exclusive page on a session for `key`
    ///
    /// Waits while every session slot is busy. Dropping the returned future
    /// at any point leaves no busy or placeholder session behind.
    pub async fn acquire_page(&self, key: &str) -> Result<ScopedPage, PoolError> {
        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;

        let now = Instant::now();
        let mut to_close = Vec::new();

        let (id, existing) = {
            let mut sessions = self.shared.table();
            let timeout = self.shared.config.session_timeout;

            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, s)| {
                    s.key == key && s.is_idle() && now.duration_since(s.created_at) >= timeout
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in expired {
                if let Some(session) = sessions.remove(&id).and_then(|s| s.session) {
                    debug!("Session {} for key '{}' exceeded its timeout", id, key);
                    to_close.push((id, session));
                }
            }

            let reusable = sessions
                .iter()
                .filter(|(_, s)| s.key == key && s.is_idle())
                .min_by_key(|(_, s)| s.last_used_at)
                .map(|(id, _)| id.clone());

            let reused = match reusable {
                Some(id) => sessions
                    .get_mut(&id)
                    .and_then(|slot| {
                        slot.state = SlotState::Busy;
                        slot.usage_count += 1;
                        slot.last_used_at = now;
                        slot.session.clone()
                    })
                    .map(|session| (id, session)),
                None => None,
            };

            match reused {
                Some((id, session)) => (id, Some(session)),
                None => {
                    if sessions.len() >= self.shared.config.max_sessions {
                        let lru = sessions
                            .iter()
                            .filter(|(_, s)| s.is_idle())
                            .min_by_key(|(_, s)| s.last_used_at)
                            .map(|(id, _)| id.clone());
                        if let Some(id) = lru {
                            if let Some(session) = sessions.remove(&id).and_then(|s| s.session) {
                                debug!("Evicting least recently used session {}", id);
                                to_close.push((id, session));
                            }
                        }
                    }

                    let id = Uuid::new_v4().to_string();
                    sessions.insert(
                        id.clone(),
                        SessionSlot {
                            key: key.to_string(),
                            state: SlotState::Creating,
                            session: None,
                            created_at: now,
                            last_used_at: now,
                            usage_count: 0,
                        },
                    );
                    (id, None)
                }
            }
        };

        close_detached(to_close);

        let session = match existing {
            Some(session) => {
                debug!("Reusing rendering session {} for key '{}'", id, key);
                session
            }
            None => self.launch_into(&id, key).await?,
        };

        let lease = Lease {
            shared: Arc::clone(&self.shared),
            id: id.clone(),
            _permit: permit,
        };

        match session.new_page().await {
            Ok(page) => Ok(ScopedPage::new(page, lease)),
            Err(source) => {
                warn!("Failed to open page in session {}: {}", id, source);
                Err(PoolError::Page {
                    session_id: id,
                    source,
                })
            }
        }
    }

    /// Launch a session for the `Creating` slot `id` and mark it busy
    async fn launch_into(&self, id: &str, key: &str) -> Result<Arc<dyn RenderSession>, PoolError> {
        let mut guard = CreatingGuard {
            shared: Arc::clone(&self.shared),
            id: id.to_string(),
            armed: true,
        };

        let session = self.engine.launch().await.map_err(|e| {
            warn!("Failed to launch {} session for key '{}': {}", self.engine.name(), key, e);
            PoolError::Launch(e)
        })?;

        let installed = {
            let mut sessions = self.shared.table();
            match sessions.get_mut(id) {
                Some(slot) if slot.state == SlotState::Creating => {
                    let now = Instant::now();
                    slot.state = SlotState::Busy;
                    slot.session = Some(Arc::clone(&session));
                    slot.usage_count = 1;
                    slot.created_at = now;
                    slot.last_used_at = now;
                    true
                }
                _ => false,
            }
        };

        if !installed {
            // Shut down while launching.
            close_detached(vec![(id.to_string(), session)]);
            return Err(PoolError::ShutDown);
        }

        guard.armed = false;
        info!("Created rendering session {} for key '{}'", id, key);
        Ok(session)
    }

    pub fn stats(&self) -> PoolStats {
        let now = Instant::now();
        let sessions = self.shared.table();

        let mut stats = PoolStats {
            active_sessions: 0,
            busy_sessions: 0,
            idle_sessions: 0,
            creating_sessions: 0,
            max_sessions: self.shared.config.max_sessions,
            sessions: Vec::with_capacity(sessions.len()),
        };

        for (id, slot) in sessions.iter() {
            match slot.state {
                SlotState::Creating => {
                    stats.creating_sessions += 1;
                    continue;
                }
                SlotState::Busy => stats.busy_sessions += 1,
                SlotState::Idle => stats.idle_sessions += 1,
            }
            stats.active_sessions += 1;
            stats.sessions.push(SessionSnapshot {
                id: id.clone(),
                key: slot.key.clone(),
                age_secs: now.duration_since(slot.created_at).as_secs(),
                idle_secs: now.duration_since(slot.last_used_at).as_secs(),
                usage_count: slot.usage_count,
                busy: slot.state == SlotState::Busy,
            });
        }

        stats.sessions.sort_by(|a, b| a.key.cmp(&b.key).then(a.id.cmp(&b.id)));
        stats
    }

    /// Stop the reaper, refuse new acquisitions and close every session
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let reaper = self
            .reaper
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = reaper {
            if let Err(e) = handle.await {
                warn!("Session reaper ended abnormally: {}", e);
            }
        }

        self.shared.permits.close();

        let sessions = self.shared.drain();
        let count = sessions.len();
        for (id, session) in sessions {
            if let Err(e) = session.close().await {
                warn!("Failed to close rendering session {}: {}", id, e);
            }
        }

        info!("Session pool shut down ({} session(s) closed)", count);
    }
}
