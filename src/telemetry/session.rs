// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! A polling session: one producer task feeding every subscriber of a key

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::handle::{Delivery, HandleSlot};
use super::sample::{Sample, SessionKey};
use super::sampler::Sampler;
use crate::error::TelemetryError;
use crate::metrics::MetricsRegistry;

/// Lifecycle of a polling session; only ever moves forward
///
/// `Running` is reached once the first fetch has been attempted, whether or
/// not it produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SessionState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Terminated = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

pub(crate) struct Session {
    key: SessionKey,
    interval: Duration,
    subscribers: Mutex<Vec<Arc<HandleSlot>>>,
    stop: CancellationToken,
    state: AtomicU8,
    metrics: MetricsRegistry,
}

impl Session {
    pub(crate) fn new(
        key: SessionKey,
        interval: Duration,
        stop: CancellationToken,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            key,
            interval,
            subscribers: Mutex::new(Vec::new()),
            stop,
            state: AtomicU8::new(SessionState::Starting as u8),
            metrics,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn advance(&self, to: SessionState) {
        self.state.fetch_max(to as u8, Ordering::AcqRel);
    }

    pub(crate) async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Adds a handle; the caller holds the registry write lock
    pub(crate) async fn attach(&self, slot: Arc<HandleSlot>) {
        self.subscribers.lock().await.push(slot);
        self.metrics.subscriber_opened();
    }

    /// Removes and closes a handle, returning how many remain
    ///
    /// `None` when the handle was not part of this session.
    pub(crate) async fn detach(&self, id: u64) -> Option<usize> {
        let mut subscribers = self.subscribers.lock().await;
        let pos = subscribers.iter().position(|s| s.id() == id)?;
        let slot = subscribers.swap_remove(pos);
        if slot.close() {
            self.metrics.subscriber_closed();
        }
        Some(subscribers.len())
    }

    /// Signals the producer to stop; it closes the remaining handles on exit
    pub(crate) fn begin_draining(&self) {
        self.advance(SessionState::Draining);
        self.stop.cancel();
    }

    /// Producer loop, runs until the stop token fires
    pub(crate) async fn run(self: Arc<Self>, sampler: Arc<Sampler>) {
        tracing::debug!(
            "Session {} started (interval: {:?})",
            self.key,
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                r = sampler.sample(&self.key.router_id, &self.key.interface_id) => r,
            };

            match result {
                Ok(sample) => {
                    self.metrics.record_fetch_duration(&self.key, started.elapsed());
                    self.fan_out(sample).await;
                }
                Err(e) => self.record_failure(&e),
            }
            self.advance(SessionState::Running);
        }

        self.terminate().await;
        tracing::debug!("Session {} terminated", self.key);
    }

    async fn fan_out(&self, sample: Sample) {
        // Snapshot so a full queue never holds the subscriber lock
        let targets: Vec<Arc<HandleSlot>> = self.subscribers.lock().await.clone();
        if self.stop.is_cancelled() {
            return;
        }

        let mut delivered = 0u64;
        let mut dropped = 0u64;
        for slot in &targets {
            match slot.try_deliver(sample) {
                Delivery::Delivered => delivered += 1,
                Delivery::Dropped => {
                    dropped += 1;
                    tracing::trace!(
                        "Subscriber {} of {} is full, sample skipped",
                        slot.id(),
                        self.key
                    );
                }
                Delivery::Closed => {}
            }
        }
        self.metrics.record_sample(&self.key, delivered, dropped);
    }

    fn record_failure(&self, err: &TelemetryError) {
        match err {
            TelemetryError::NotFound { .. } => {
                tracing::debug!("Sampling {} failed: {}", self.key, err);
            }
            _ => tracing::warn!("Sampling {} failed: {}", self.key, err),
        }
        self.metrics.record_sample_error(&self.key, err.kind());
    }

    async fn terminate(&self) {
        self.advance(SessionState::Draining);
        let slots: Vec<Arc<HandleSlot>> = self.subscribers.lock().await.drain(..).collect();
        for slot in slots {
            if slot.close() {
                self.metrics.subscriber_closed();
            }
        }
        self.metrics.forget_session(&self.key).await;
        self.advance(SessionState::Terminated);
    }
}
