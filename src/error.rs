// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the telemetry engine and the service around it

use thiserror::Error;

/// Errors produced by the telemetry engine
///
/// Sampling errors (`Transport`, `Decode`, `NotFound`) are recovered inside the
/// session loop and never reach subscribers. Only `ShuttingDown` is surfaced
/// to callers of `subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// Router unreachable, timed out, or rejected the command
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Interface (or router) not present
    #[error("Interface '{interface}' not found on router '{router}'")]
    NotFound { router: String, interface: String },

    /// Registry has been stopped
    #[error("Telemetry registry is shutting down")]
    ShuttingDown,
}

impl TelemetryError {
    /// Short label used for metrics and structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::NotFound { .. } => "not_found",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Network or IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Metrics encoding error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Address parsing error
    #[error("Address parse error")]
    AddrParse(#[from] std::net::AddrParseError),
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;
