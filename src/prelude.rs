// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! ```rust
//! use mikrotik_telemetry::prelude::*;
//! ```

// Core types
pub use crate::config::{Config, PollingSettings, RouterConfig, WatchConfig};
pub use crate::error::{AppError, Result, TelemetryError};

// Telemetry engine
pub use crate::telemetry::{
    Sample, SampleStream, Sampler, SessionKey, SessionState, SubscriptionRegistry,
};

// Router port
pub use crate::router::{Command, CommandResult, PortError, RouterPort, RouterPorts};

// Metrics
pub use crate::metrics::MetricsRegistry;
