// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP API module
//!
//! Operational endpoints for the telemetry service.
//!
//! # Endpoints
//! - `GET /health`: service status and engine counters
//! - `GET /metrics`: Prometheus metrics

pub mod handlers;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::config::Config;
use crate::telemetry::SubscriptionRegistry;

/// Application state shared with endpoints
pub struct AppState {
    pub config: Config,
    pub registry: SubscriptionRegistry,
}

/// Creates the main Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
}
