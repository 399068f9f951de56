// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prometheus metrics for the telemetry engine
//!
//! Engine bookkeeping (sessions, subscribers, fan-out, sampling errors) and
//! interface counters fed by the watch collector.

mod labels;
mod registry;

/// Labels for interfaces and sampling errors
pub use labels::{InterfaceLabels, SampleErrorLabels};

/// Prometheus metrics registry
pub use registry::MetricsRegistry;
