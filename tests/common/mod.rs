// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

#![allow(dead_code)]

use async_trait::async_trait;
use mikrotik_telemetry::{
    Command, CommandResult, PollingSettings, PortError, RouterPort, RouterPorts, Row, Sampler,
    SubscriptionRegistry,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted router port
///
/// Every `print` answers with one row whose `tx-byte` is the call number, so
/// tests can tell samples apart and check their order.
#[derive(Default)]
pub struct MockPort {
    calls: AtomicUsize,
    fail_even_calls: AtomicBool,
    empty: AtomicBool,
    stalled: AtomicBool,
    fixed: Option<(u64, u64)>,
}

impl MockPort {
    pub fn counting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answers with the same tx/rx byte counters
    pub fn fixed(tx_bytes: u64, rx_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            fixed: Some((tx_bytes, rx_bytes)),
            ..Self::default()
        })
    }

    pub fn failing_on_even_calls() -> Arc<Self> {
        let port = Self::default();
        port.fail_even_calls.store(true, Ordering::SeqCst);
        Arc::new(port)
    }

    pub fn set_fail_even_calls(&self, fail: bool) {
        self.fail_even_calls.store(fail, Ordering::SeqCst);
    }

    /// Answers with no rows, as for an unknown interface
    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    /// Calls made while stalled never answer
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouterPort for MockPort {
    fn is_connected(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<(), PortError> {
        Ok(())
    }

    async fn execute_command(&self, cmd: &Command) -> Result<CommandResult, PortError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(cmd.path, "/interface");
        assert_eq!(cmd.action, "print");

        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.fail_even_calls.load(Ordering::SeqCst) && n % 2 == 0 {
            return Err(PortError::Timeout(format!("scripted failure on call {n}")));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(CommandResult::ok(Vec::new()));
        }

        let (tx, rx) = self.fixed.unwrap_or((n as u64, n as u64 * 2));
        let mut row = Row::new();
        row.insert(".id".to_string(), cmd.args.get(".id").cloned().unwrap_or_default());
        row.insert("tx-byte".to_string(), tx.to_string());
        row.insert("rx-byte".to_string(), rx.to_string());
        Ok(CommandResult::ok(vec![row]))
    }
}

pub fn ports_with(router_id: &str, port: Arc<MockPort>) -> RouterPorts {
    let mut ports = RouterPorts::new();
    ports.insert(router_id, port);
    ports
}

pub fn registry_with(router_id: &str, port: Arc<MockPort>) -> SubscriptionRegistry {
    let sampler = Sampler::new(ports_with(router_id, port), Duration::from_secs(5));
    SubscriptionRegistry::new(sampler, PollingSettings::default())
}

/// Lets spawned watchdogs and producers run without moving time noticeably
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
