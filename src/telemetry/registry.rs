// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Subscription registry: shares one polling session per (router, interface)
//!
//! Subscribers to the same key share a session regardless of the interval
//! they asked for; the first subscriber fixes the interval. A session starts
//! with its first subscriber and is stopped as soon as the last one leaves.
//!
//! Locking: the registry lock is always taken before a session's subscriber
//! lock, never the other way around.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::handle::{self, SampleStream};
use super::sample::SessionKey;
use super::sampler::Sampler;
use super::session::{Session, SessionState};
use crate::config::PollingSettings;
use crate::error::TelemetryError;
use crate::metrics::MetricsRegistry;

/// Point-in-time view of one running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub key: SessionKey,
    pub interval: Duration,
    pub state: SessionState,
    pub subscribers: usize,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionKey, Arc<Session>>,
    stopped: bool,
}

struct Inner {
    state: RwLock<RegistryState>,
    sampler: Arc<Sampler>,
    settings: PollingSettings,
    metrics: MetricsRegistry,
    shutdown: CancellationToken,
    producers: TaskTracker,
}

/// Shared handle to the telemetry engine
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new(sampler: Sampler, settings: PollingSettings) -> Self {
        Self::with_metrics(sampler, settings, MetricsRegistry::new())
    }

    #[must_use]
    pub fn with_metrics(sampler: Sampler, settings: PollingSettings, metrics: MetricsRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(RegistryState::default()),
                sampler: Arc::new(sampler),
                settings,
                metrics,
                shutdown: CancellationToken::new(),
                producers: TaskTracker::new(),
            }),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.inner.metrics
    }

    #[must_use]
    pub fn settings(&self) -> PollingSettings {
        self.inner.settings
    }

    /// Subscribes to samples of `interface_id` on `router_id`
    ///
    /// `interval` is clamped to the configured bounds and only takes effect
    /// when this call creates the session. The subscription ends when `ctx`
    /// is cancelled, when the returned stream is dropped, or on [`stop`].
    ///
    /// [`stop`]: Self::stop
    ///
    /// # Errors
    ///
    /// Returns `ShuttingDown` once [`stop`](Self::stop) has been called.
    pub async fn subscribe(
        &self,
        ctx: CancellationToken,
        router_id: &str,
        interface_id: &str,
        interval: Duration,
    ) -> Result<SampleStream, TelemetryError> {
        let key = SessionKey::new(router_id, interface_id);
        let interval = self.inner.settings.clamp(interval);
        let (slot, stream) = handle::channel(key.clone(), self.inner.settings.queue_capacity);
        let slot = Arc::new(slot);

        {
            let mut state = self.inner.state.write().await;
            if state.stopped {
                return Err(TelemetryError::ShuttingDown);
            }

            if let Some(session) = state.sessions.get(&key) {
                session.attach(Arc::clone(&slot)).await;
                tracing::debug!(
                    "Subscriber {} joined session {} ({} subscribers)",
                    slot.id(),
                    key,
                    session.subscriber_count().await
                );
            } else {
                let session = Arc::new(Session::new(
                    key.clone(),
                    interval,
                    self.inner.shutdown.child_token(),
                    self.inner.metrics.clone(),
                ));
                // Attached before the producer can take its first sample
                session.attach(Arc::clone(&slot)).await;
                self.inner
                    .producers
                    .spawn(Arc::clone(&session).run(Arc::clone(&self.inner.sampler)));
                state.sessions.insert(key.clone(), session);
                self.inner.metrics.set_active_sessions(state.sessions.len());
                tracing::info!("Started session {} (interval: {:?})", key, interval);
            }
        }

        let registry = self.clone();
        let id = slot.id();
        let done = slot.done();
        tokio::spawn(async move {
            tokio::select! {
                () = ctx.cancelled() => {}
                () = done.cancelled() => {}
            }
            registry.detach(&key, id).await;
        });

        Ok(stream)
    }

    /// Removes one handle, stopping its session when it was the last
    async fn detach(&self, key: &SessionKey, id: u64) {
        let mut state = self.inner.state.write().await;
        let Some(session) = state.sessions.get(key).cloned() else {
            return;
        };
        let Some(remaining) = session.detach(id).await else {
            return;
        };

        tracing::debug!(
            "Subscriber {} left session {} ({} remaining)",
            id,
            key,
            remaining
        );
        if remaining == 0 {
            session.begin_draining();
            state.sessions.remove(key);
            self.inner.metrics.set_active_sessions(state.sessions.len());
            tracing::info!("Stopped session {} (no subscribers left)", key);
        }
    }

    /// Stops every session and waits for all producers to exit
    ///
    /// Every open stream ends after its buffered samples. Safe to call more
    /// than once; later `subscribe` calls fail with `ShuttingDown`.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.write().await;
            if !state.stopped {
                tracing::info!(
                    "Stopping telemetry registry ({} active sessions)",
                    state.sessions.len()
                );
            }
            state.stopped = true;
            self.inner.shutdown.cancel();
            for (_, session) in state.sessions.drain() {
                session.begin_draining();
            }
            self.inner.metrics.set_active_sessions(0);
        }

        self.inner.producers.close();
        self.inner.producers.wait().await;
        tracing::debug!("All polling producers have exited");
    }

    pub async fn is_stopped(&self) -> bool {
        self.inner.state.read().await.stopped
    }

    /// Number of sessions currently registered
    pub async fn active_sessions(&self) -> usize {
        self.inner.state.read().await.sessions.len()
    }

    /// Number of open handles across all sessions
    pub async fn subscriber_count(&self) -> usize {
        let state = self.inner.state.read().await;
        let mut total = 0;
        for session in state.sessions.values() {
            total += session.subscriber_count().await;
        }
        total
    }

    /// Polling interval of the session for `key`, if one is running
    pub async fn session_interval(&self, key: &SessionKey) -> Option<Duration> {
        self.inner
            .state
            .read()
            .await
            .sessions
            .get(key)
            .map(|s| s.interval())
    }

    /// Lifecycle state of the session for `key`, if one is registered
    pub async fn session_state(&self, key: &SessionKey) -> Option<SessionState> {
        self.inner
            .state
            .read()
            .await
            .sessions
            .get(key)
            .map(|s| s.state())
    }

    /// Snapshot of every registered session, ordered by key
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let state = self.inner.state.read().await;
        let mut out = Vec::with_capacity(state.sessions.len());
        for (key, session) in &state.sessions {
            out.push(SessionInfo {
                key: key.clone(),
                interval: session.interval(),
                state: session.state(),
                subscribers: session.subscriber_count().await,
            });
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Producer tasks not yet exited, including sessions still draining
    #[must_use]
    pub fn producer_tasks(&self) -> usize {
        self.inner.producers.len()
    }
}
