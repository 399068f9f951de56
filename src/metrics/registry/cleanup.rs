// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Removal of label sets that belong to ended sessions

use crate::metrics::labels::{InterfaceLabels, SampleErrorLabels};
use crate::telemetry::SessionKey;

use super::MetricsRegistry;

/// Error kinds a session can record while sampling
const SAMPLE_ERROR_KINDS: [&str; 3] = ["transport", "decode", "not_found"];

impl MetricsRegistry {
    /// Drops every label set of a session once its producer has exited
    ///
    /// A later session for the same key starts its series from zero, which
    /// Prometheus treats as a counter reset.
    pub async fn forget_session(&self, key: &SessionKey) {
        let labels = InterfaceLabels::from(key);
        self.telemetry_samples.remove(&labels);
        self.telemetry_samples_delivered.remove(&labels);
        self.telemetry_samples_dropped.remove(&labels);
        self.telemetry_fetch_duration_milliseconds.remove(&labels);
        for kind in SAMPLE_ERROR_KINDS {
            self.telemetry_sample_errors.remove(&SampleErrorLabels {
                router: key.router_id.clone(),
                interface: key.interface_id.clone(),
                kind: kind.to_string(),
            });
        }

        self.forget_interface(key).await;
        tracing::trace!("Removed label sets of session {}", key);
    }

    /// Drops the interface counters and baseline of `key`
    pub async fn forget_interface(&self, key: &SessionKey) {
        let labels = InterfaceLabels::from(key);
        self.prev_iface.lock().await.remove(&labels);

        self.interface_rx_bytes.remove(&labels);
        self.interface_tx_bytes.remove(&labels);
        self.interface_rx_packets.remove(&labels);
        self.interface_tx_packets.remove(&labels);
        self.interface_rx_errors.remove(&labels);
        self.interface_tx_errors.remove(&labels);
        self.interface_rx_drops.remove(&labels);
        self.interface_tx_drops.remove(&labels);
        self.interface_last_sample_timestamp_seconds.remove(&labels);
    }
}
