// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! `RouterOS` binary API implementation of [`RouterPort`]
//!
//! Each port owns at most one connection. Commands are serialised through an
//! async mutex; the connection is moved out of its slot while a command is in
//! flight and only returned on success, so a cancelled or failed call never
//! leaves a half-read reply behind for the next caller.

mod backoff;
mod connection;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{Command, CommandResult, PortError, RouterPort};
use crate::config::RouterConfig;
use backoff::ConnectionState;
use connection::RouterOsConnection;
pub use connection::{encode_length, encode_word};

struct Slot {
    connection: Option<RouterOsConnection>,
    state: ConnectionState,
}

/// Router port speaking the `RouterOS` API (port 8728)
pub struct RouterOsPort {
    config: RouterConfig,
    slot: Mutex<Slot>,
    connected: AtomicBool,
}

impl RouterOsPort {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(Slot {
                connection: None,
                state: ConnectionState::new(),
            }),
            connected: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    async fn establish(&self, slot: &mut Slot) -> Result<RouterOsConnection, PortError> {
        let addr = &self.config.address;

        if slot.state.should_skip_attempt() {
            tracing::debug!(
                "Skipping connection attempt to {} (backoff: {} consecutive errors, delay: {:?})",
                addr,
                slot.state.consecutive_errors,
                slot.state.backoff_delay()
            );
            return Err(PortError::Backoff {
                address: addr.clone(),
                errors: slot.state.consecutive_errors,
            });
        }

        tracing::debug!("Creating new connection for {}", addr);
        let result = async {
            let mut conn = RouterOsConnection::connect(addr).await?;
            conn.login(&self.config.username, &self.config.password)
                .await?;
            Ok::<_, PortError>(conn)
        }
        .await;

        match result {
            Ok(conn) => {
                tracing::trace!("Login successful, connection ready");
                slot.state.record_success();
                Ok(conn)
            }
            Err(e) => {
                slot.state.record_error();
                tracing::trace!(
                    "Connection error recorded for {}, consecutive errors: {}",
                    addr,
                    slot.state.consecutive_errors
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RouterPort for RouterOsPort {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn connect(&self) -> Result<(), PortError> {
        let mut slot = self.slot.lock().await;
        if slot.connection.is_some() {
            return Ok(());
        }
        let conn = self.establish(&mut slot).await?;
        slot.connection = Some(conn);
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn execute_command(&self, cmd: &Command) -> Result<CommandResult, PortError> {
        let mut slot = self.slot.lock().await;

        let mut conn = match slot.connection.take() {
            Some(conn) => conn,
            None => self.establish(&mut slot).await?,
        };
        // Stays false until the connection is returned to its slot
        self.connected.store(false, Ordering::Release);

        let words = command_words(cmd);
        tracing::trace!("Sending to {}: {:?}", self.config.name, words);

        match conn.command(&words).await {
            Ok(reply) => {
                slot.state.record_success();
                slot.connection = Some(conn);
                self.connected.store(true, Ordering::Release);

                Ok(match reply.trap {
                    Some(message) => CommandResult::failed(message),
                    None => CommandResult {
                        success: true,
                        id: reply.ret,
                        data: reply.rows,
                        error: None,
                    },
                })
            }
            Err(e) => {
                slot.state.record_error();
                tracing::debug!(
                    "Dropping connection to {} after error: {}",
                    self.config.address,
                    e
                );
                Err(e)
            }
        }
    }
}

/// Translates a structured command into API words
///
/// For `print`, arguments and filters become `?key=value` queries; every
/// other action sends them as `=key=value` attributes.
pub(crate) fn command_words(cmd: &Command) -> Vec<String> {
    let mut words = vec![format!(
        "{}/{}",
        cmd.path.trim_end_matches('/'),
        cmd.action
    )];
    let is_print = cmd.action == "print";

    for (k, v) in &cmd.args {
        if is_print {
            words.push(format!("?{k}={v}"));
        } else {
            words.push(format!("={k}={v}"));
        }
    }
    if is_print {
        for (k, v) in &cmd.query_filter {
            words.push(format!("?{k}={v}"));
        }
    }
    if !cmd.props.is_empty() {
        words.push(format!("=.proplist={}", cmd.props.join(",")));
    }
    if let Some(id) = &cmd.id {
        words.push(format!("=.id={id}"));
    }
    words
}
