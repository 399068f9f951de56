// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Scrape and engine-level bookkeeping helpers

use crate::metrics::labels::{InterfaceLabels, SampleErrorLabels};
use crate::telemetry::SessionKey;
use prometheus_client::encoding::text::encode;
use std::time::Duration;

use super::MetricsRegistry;

impl MetricsRegistry {
    /// Renders the registry in the Prometheus text exposition format
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to encode.
    pub async fn encode_metrics(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let registry = self.registry.lock().await;
        let mut buffer = String::new();
        encode(&mut buffer, &registry)?;
        Ok(buffer)
    }

    pub fn set_active_sessions(&self, count: usize) {
        #[allow(clippy::cast_possible_wrap)]
        self.telemetry_active_sessions.set(count as i64);
    }

    pub fn subscriber_opened(&self) {
        self.telemetry_subscribers.inc();
    }

    pub fn subscriber_closed(&self) {
        self.telemetry_subscribers.dec();
    }

    /// Records one successful sample and its fan-out outcome
    pub fn record_sample(&self, key: &SessionKey, delivered: u64, dropped: u64) {
        let labels = InterfaceLabels::from(key);
        self.telemetry_samples.get_or_create(&labels).inc();
        self.telemetry_samples_delivered
            .get_or_create(&labels)
            .inc_by(delivered);
        self.telemetry_samples_dropped
            .get_or_create(&labels)
            .inc_by(dropped);
    }

    pub fn record_sample_error(&self, key: &SessionKey, kind: &str) {
        let labels = SampleErrorLabels {
            router: key.router_id.clone(),
            interface: key.interface_id.clone(),
            kind: kind.to_string(),
        };
        self.telemetry_sample_errors.get_or_create(&labels).inc();
    }

    pub fn record_fetch_duration(&self, key: &SessionKey, duration: Duration) {
        // Stored as milliseconds for precision
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let millis = (duration.as_secs_f64() * 1000.0).round() as i64;
        self.telemetry_fetch_duration_milliseconds
            .get_or_create(&InterfaceLabels::from(key))
            .set(millis);
    }

    #[must_use]
    pub fn active_sessions(&self) -> i64 {
        self.telemetry_active_sessions.get()
    }

    #[must_use]
    pub fn subscribers(&self) -> i64 {
        self.telemetry_subscribers.get()
    }

    #[must_use]
    pub fn samples_dropped(&self, key: &SessionKey) -> u64 {
        self.telemetry_samples_dropped
            .get(&InterfaceLabels::from(key))
            .map_or(0, |c| c.get())
    }

    #[must_use]
    pub fn sample_errors(&self, key: &SessionKey, kind: &str) -> u64 {
        let labels = SampleErrorLabels {
            router: key.router_id.clone(),
            interface: key.interface_id.clone(),
            kind: kind.to_string(),
        };
        self.telemetry_sample_errors
            .get(&labels)
            .map_or(0, |c| c.get())
    }
}
