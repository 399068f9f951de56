// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Interface counter updates from telemetry samples

use crate::metrics::labels::InterfaceLabels;
use crate::telemetry::{Sample, SessionKey};
use std::time::UNIX_EPOCH;

use super::{InterfaceSnapshot, MetricsRegistry};

impl From<&Sample> for InterfaceSnapshot {
    fn from(sample: &Sample) -> Self {
        Self {
            rx_bytes: sample.rx_bytes,
            tx_bytes: sample.tx_bytes,
            rx_packets: sample.rx_packets,
            tx_packets: sample.tx_packets,
            rx_errors: u64::from(sample.rx_errors),
            tx_errors: u64::from(sample.tx_errors),
            rx_drops: u64::from(sample.rx_drops),
            tx_drops: u64::from(sample.tx_drops),
        }
    }
}

/// Increase since the previous reading
///
/// A smaller reading means the router reset its counters, so the whole new
/// value counts as the increase.
fn delta(current: u64, previous: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        current
    }
}

impl MetricsRegistry {
    /// Applies a sample to the interface counters
    ///
    /// The first sample for an interface only establishes the baseline.
    #[allow(clippy::similar_names)] // rx/tx naming pattern is intentional and clear
    pub async fn update_interface(&self, key: &SessionKey, sample: &Sample) {
        let labels = InterfaceLabels::from(key);
        let current = InterfaceSnapshot::from(sample);

        {
            let mut prev = self.prev_iface.lock().await;
            let snapshot = prev.get(&labels).copied().unwrap_or(current);

            self.interface_rx_bytes
                .get_or_create(&labels)
                .inc_by(delta(current.rx_bytes, snapshot.rx_bytes));
            self.interface_tx_bytes
                .get_or_create(&labels)
                .inc_by(delta(current.tx_bytes, snapshot.tx_bytes));
            self.interface_rx_packets
                .get_or_create(&labels)
                .inc_by(delta(current.rx_packets, snapshot.rx_packets));
            self.interface_tx_packets
                .get_or_create(&labels)
                .inc_by(delta(current.tx_packets, snapshot.tx_packets));
            self.interface_rx_errors
                .get_or_create(&labels)
                .inc_by(delta(current.rx_errors, snapshot.rx_errors));
            self.interface_tx_errors
                .get_or_create(&labels)
                .inc_by(delta(current.tx_errors, snapshot.tx_errors));
            self.interface_rx_drops
                .get_or_create(&labels)
                .inc_by(delta(current.rx_drops, snapshot.rx_drops));
            self.interface_tx_drops
                .get_or_create(&labels)
                .inc_by(delta(current.tx_drops, snapshot.tx_drops));

            prev.insert(labels.clone(), current);
        }

        let observed = sample
            .observed_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        #[allow(clippy::cast_possible_wrap)]
        self.interface_last_sample_timestamp_seconds
            .get_or_create(&labels)
            .set(observed as i64);
    }

    #[must_use]
    pub fn interface_rx_bytes(&self, key: &SessionKey) -> u64 {
        self.interface_rx_bytes
            .get(&InterfaceLabels::from(key))
            .map_or(0, |c| c.get())
    }

    #[must_use]
    pub fn interface_tx_bytes(&self, key: &SessionKey) -> u64 {
        self.interface_tx_bytes
            .get(&InterfaceLabels::from(key))
            .map_or(0, |c| c.get())
    }
}
