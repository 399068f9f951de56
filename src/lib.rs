// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # MikroTik Telemetry
//!
//! Shared, deduplicated interface statistics polling for MikroTik routers.
//!
//! Any number of consumers may subscribe to the counters of a (router,
//! interface) pair. Each pair is polled by exactly one session no matter how
//! many subscribers it has; slow consumers lose samples instead of stalling
//! the producer.
//!
//! ## Main modules
//! - `api`: HTTP health and metrics endpoints
//! - `collector`: watch entries feeding Prometheus counters
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus registry
//! - `router`: router command port and the RouterOS API client
//! - `telemetry`: sampler, sessions and the subscription registry
//! - `prelude`: commonly used types and traits

mod api;
mod collector;
mod config;
mod error;
mod metrics;
pub mod prelude;
mod router;
mod telemetry;

// Re-export commonly used types
/// Application configuration
pub use config::{Config, PollingSettings, RouterConfig, WatchConfig};

/// Error and result types
pub use error::{AppError, Result, TelemetryError};

/// HTTP API router and state
pub use api::{AppState, create_router};

/// Watch collection tasks
pub use collector::start_collection;

/// Metrics registry and labels
pub use metrics::{InterfaceLabels, MetricsRegistry, SampleErrorLabels};

/// Router command port
pub use router::{Command, CommandResult, PortError, RouterPort, RouterPorts, Row};

/// RouterOS API port and wire encoding (public for tests)
pub use router::routeros::{RouterOsPort, encode_length, encode_word};

/// Telemetry engine
pub use telemetry::{
    Sample, SampleStream, Sampler, SessionInfo, SessionKey, SessionState, SubscriptionRegistry,
    stats_command,
};
