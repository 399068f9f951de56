// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Telemetry data model

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Identifies one (router, interface) stream
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SessionKey {
    pub router_id: String,
    pub interface_id: String,
}

impl SessionKey {
    #[must_use]
    pub fn new(router_id: impl Into<String>, interface_id: impl Into<String>) -> Self {
        Self {
            router_id: router_id.into(),
            interface_id: interface_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.router_id, self.interface_id)
    }
}

/// One observation of an interface's counters
///
/// Counters are monotonic on the device but reset when it reboots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_errors: u32,
    pub rx_errors: u32,
    pub tx_drops: u32,
    pub rx_drops: u32,
    /// Local wall-clock time the sample was decoded
    pub observed_at: SystemTime,
}
