// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Router port: the command interface the telemetry engine drives
//!
//! The engine only depends on [`RouterPort`]. [`routeros`] provides the
//! implementation over the `RouterOS` binary API used by the service binary.

pub mod routeros;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// One keyed row of a tabular `RouterOS` response
pub type Row = HashMap<String, String>;

/// Errors raised by a router port implementation
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("Connection to {address} temporarily disabled after {errors} consecutive errors")]
    Backoff { address: String, errors: u32 },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A structured command against a `RouterOS` menu
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Menu path, e.g. `/interface`
    pub path: String,
    /// Action, e.g. `print`
    pub action: String,
    /// Arguments as key-value pairs
    pub args: BTreeMap<String, String>,
    /// Key-value filter for `print`
    pub query_filter: BTreeMap<String, String>,
    /// Properties to return for `print` (empty = all)
    pub props: Vec<String>,
    /// Target item ID for `set`/`remove`
    pub id: Option<String>,
}

impl Command {
    #[must_use]
    pub fn new(path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_filter.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.props = props.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Outcome of a command that reached the router
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    /// ID of the created/modified item, when the router returns one
    pub id: Option<String>,
    pub data: Vec<Row>,
    /// Router-side failure message when `success` is false
    pub error: Option<String>,
}

impl CommandResult {
    #[must_use]
    pub fn ok(data: Vec<Row>) -> Self {
        Self {
            success: true,
            data,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Command interface to a single router
///
/// Implementations serialise concurrent `execute_command` calls themselves.
/// Callers bound each call with their own timeout; dropping the future
/// abandons the call.
#[async_trait]
pub trait RouterPort: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn connect(&self) -> Result<(), PortError>;

    async fn execute_command(&self, cmd: &Command) -> Result<CommandResult, PortError>;
}

/// Directory of router ports keyed by router ID
#[derive(Clone, Default)]
pub struct RouterPorts {
    ports: HashMap<String, Arc<dyn RouterPort>>,
}

impl RouterPorts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, router_id: impl Into<String>, port: Arc<dyn RouterPort>) {
        self.ports.insert(router_id.into(), port);
    }

    #[must_use]
    pub fn get(&self, router_id: &str) -> Option<Arc<dyn RouterPort>> {
        self.ports.get(router_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
