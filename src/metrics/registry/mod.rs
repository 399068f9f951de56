// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metrics registry and update logic

mod cleanup;
mod init;
mod scrape;
mod update;

use crate::metrics::labels::{InterfaceLabels, SampleErrorLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Copy)]
struct InterfaceSnapshot {
    rx_bytes: u64,
    tx_bytes: u64,
    rx_packets: u64,
    tx_packets: u64,
    rx_errors: u64,
    tx_errors: u64,
    rx_drops: u64,
    tx_drops: u64,
}

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    // engine bookkeeping
    telemetry_active_sessions: Gauge,
    telemetry_subscribers: Gauge,
    telemetry_samples: Family<InterfaceLabels, Counter>,
    telemetry_samples_delivered: Family<InterfaceLabels, Counter>,
    telemetry_samples_dropped: Family<InterfaceLabels, Counter>,
    telemetry_sample_errors: Family<SampleErrorLabels, Counter>,
    telemetry_fetch_duration_milliseconds: Family<InterfaceLabels, Gauge>,
    // counters (delta-applied)
    interface_rx_bytes: Family<InterfaceLabels, Counter>,
    interface_tx_bytes: Family<InterfaceLabels, Counter>,
    interface_rx_packets: Family<InterfaceLabels, Counter>,
    interface_tx_packets: Family<InterfaceLabels, Counter>,
    interface_rx_errors: Family<InterfaceLabels, Counter>,
    interface_tx_errors: Family<InterfaceLabels, Counter>,
    interface_rx_drops: Family<InterfaceLabels, Counter>,
    interface_tx_drops: Family<InterfaceLabels, Counter>,
    interface_last_sample_timestamp_seconds: Family<InterfaceLabels, Gauge>,
    prev_iface: Arc<Mutex<HashMap<InterfaceLabels, InterfaceSnapshot>>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
