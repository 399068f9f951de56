// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! One-shot interface statistics fetch

use std::time::{Duration, SystemTime};
use tokio::time::timeout;

use super::sample::Sample;
use crate::error::TelemetryError;
use crate::router::{Command, RouterPort, RouterPorts, Row};

/// Counter columns of `/interface print`
const COUNTER_FIELDS: [&str; 8] = [
    "tx-byte",
    "rx-byte",
    "tx-packet",
    "rx-packet",
    "tx-error",
    "rx-error",
    "tx-drop",
    "rx-drop",
];

/// The stats query issued for one interface
#[must_use]
pub fn stats_command(interface_id: &str) -> Command {
    Command::new("/interface", "print").arg(".id", interface_id)
}

/// Fetches and decodes interface counters through the router ports
///
/// Never retries; the session loop decides what to do with failures.
pub struct Sampler {
    ports: RouterPorts,
    fetch_timeout: Duration,
}

impl Sampler {
    #[must_use]
    pub fn new(ports: RouterPorts, fetch_timeout: Duration) -> Self {
        Self {
            ports,
            fetch_timeout,
        }
    }

    /// Takes one sample of `interface_id` on `router_id`
    ///
    /// # Errors
    ///
    /// `Transport` when the router cannot be reached, times out, or rejects the
    /// query; `NotFound` when the router or interface is unknown; `Decode`
    /// when the returned row carries no counters.
    pub async fn sample(&self, router_id: &str, interface_id: &str) -> Result<Sample, TelemetryError> {
        let port = self
            .ports
            .get(router_id)
            .ok_or_else(|| TelemetryError::NotFound {
                router: router_id.to_string(),
                interface: interface_id.to_string(),
            })?;

        let rows = timeout(self.fetch_timeout, fetch(port.as_ref(), interface_id))
            .await
            .map_err(|_| {
                TelemetryError::Transport(format!(
                    "router '{}' did not answer within {:?}",
                    router_id, self.fetch_timeout
                ))
            })??;

        let Some(row) = rows.first() else {
            return Err(TelemetryError::NotFound {
                router: router_id.to_string(),
                interface: interface_id.to_string(),
            });
        };

        tracing::trace!("Stats row for {}:{}: {:?}", router_id, interface_id, row);
        decode_sample(row)
    }
}

async fn fetch(port: &dyn RouterPort, interface_id: &str) -> Result<Vec<Row>, TelemetryError> {
    if !port.is_connected() {
        port.connect()
            .await
            .map_err(|e| TelemetryError::Transport(e.to_string()))?;
    }

    let result = port
        .execute_command(&stats_command(interface_id))
        .await
        .map_err(|e| TelemetryError::Transport(e.to_string()))?;

    if !result.success {
        return Err(TelemetryError::Transport(
            result
                .error
                .unwrap_or_else(|| "command failed without message".to_string()),
        ));
    }
    Ok(result.data)
}

/// Decodes a stats row with lenient counter parsing
///
/// Missing or non-numeric counters read as zero. A row with none of the
/// counter columns is not an interface stats row.
pub(crate) fn decode_sample(row: &Row) -> Result<Sample, TelemetryError> {
    if !COUNTER_FIELDS.iter().any(|f| row.contains_key(*f)) {
        return Err(TelemetryError::Decode(
            "row carries no interface counters".to_string(),
        ));
    }

    Ok(Sample {
        tx_bytes: counter(row, "tx-byte"),
        rx_bytes: counter(row, "rx-byte"),
        tx_packets: counter(row, "tx-packet"),
        rx_packets: counter(row, "rx-packet"),
        tx_errors: small_counter(row, "tx-error"),
        rx_errors: small_counter(row, "rx-error"),
        tx_drops: small_counter(row, "tx-drop"),
        rx_drops: small_counter(row, "rx-drop"),
        observed_at: SystemTime::now(),
    })
}

fn counter(row: &Row, key: &str) -> u64 {
    row.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn small_counter(row: &Row, key: &str) -> u32 {
    u32::try_from(counter(row, key)).unwrap_or(u32::MAX)
}
