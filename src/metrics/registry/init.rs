// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Registry initialization and metric registration

use crate::metrics::labels::{InterfaceLabels, SampleErrorLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::MetricsRegistry;

impl MetricsRegistry {
    #[allow(clippy::similar_names)] // rx/tx naming pattern is intentional
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let telemetry_active_sessions = Gauge::default();
        registry.register(
            "mikrotik_telemetry_active_sessions",
            "Number of running polling sessions",
            telemetry_active_sessions.clone(),
        );
        let telemetry_subscribers = Gauge::default();
        registry.register(
            "mikrotik_telemetry_subscribers",
            "Number of open subscriber handles",
            telemetry_subscribers.clone(),
        );
        let telemetry_samples = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_telemetry_samples",
            "Successful samples taken per interface",
            telemetry_samples.clone(),
        );
        let telemetry_samples_delivered = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_telemetry_samples_delivered",
            "Samples enqueued to subscriber handles",
            telemetry_samples_delivered.clone(),
        );
        let telemetry_samples_dropped = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_telemetry_samples_dropped",
            "Samples skipped because a subscriber queue was full",
            telemetry_samples_dropped.clone(),
        );
        let telemetry_sample_errors = Family::<SampleErrorLabels, Counter>::default();
        registry.register(
            "mikrotik_telemetry_sample_errors",
            "Failed sampling attempts by error kind",
            telemetry_sample_errors.clone(),
        );
        let telemetry_fetch_duration_milliseconds = Family::<InterfaceLabels, Gauge>::default();
        registry.register(
            "mikrotik_telemetry_fetch_duration_milliseconds",
            "Duration of the last successful stats fetch in milliseconds",
            telemetry_fetch_duration_milliseconds.clone(),
        );

        let interface_rx_bytes = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_rx_bytes",
            "Received bytes on interface",
            interface_rx_bytes.clone(),
        );
        let interface_tx_bytes = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_tx_bytes",
            "Transmitted bytes on interface",
            interface_tx_bytes.clone(),
        );
        let interface_rx_packets = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_rx_packets",
            "Received packets on interface",
            interface_rx_packets.clone(),
        );
        let interface_tx_packets = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_tx_packets",
            "Transmitted packets on interface",
            interface_tx_packets.clone(),
        );
        let interface_rx_errors = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_rx_errors",
            "Receive errors on interface",
            interface_rx_errors.clone(),
        );
        let interface_tx_errors = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_tx_errors",
            "Transmit errors on interface",
            interface_tx_errors.clone(),
        );
        let interface_rx_drops = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_rx_drops",
            "Received packets dropped on interface",
            interface_rx_drops.clone(),
        );
        let interface_tx_drops = Family::<InterfaceLabels, Counter>::default();
        registry.register(
            "mikrotik_interface_tx_drops",
            "Transmitted packets dropped on interface",
            interface_tx_drops.clone(),
        );
        let interface_last_sample_timestamp_seconds = Family::<InterfaceLabels, Gauge>::default();
        registry.register(
            "mikrotik_interface_last_sample_timestamp_seconds",
            "Unix timestamp of the last sample applied for the interface",
            interface_last_sample_timestamp_seconds.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            telemetry_active_sessions,
            telemetry_subscribers,
            telemetry_samples,
            telemetry_samples_delivered,
            telemetry_samples_dropped,
            telemetry_sample_errors,
            telemetry_fetch_duration_milliseconds,
            interface_rx_bytes,
            interface_tx_bytes,
            interface_rx_packets,
            interface_tx_packets,
            interface_rx_errors,
            interface_tx_errors,
            interface_rx_drops,
            interface_tx_drops,
            interface_last_sample_timestamp_seconds,
            prev_iface: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
