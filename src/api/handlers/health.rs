// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::telemetry::{SessionInfo, SessionState};

/// Health check endpoint response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
    pub subscribers: usize,
    pub sessions: Vec<SessionSummary>,
}

/// One running session as reported by /health
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub router: String,
    pub interface: String,
    pub state: SessionState,
    pub interval_ms: u64,
    pub subscribers: usize,
}

impl From<SessionInfo> for SessionSummary {
    fn from(info: SessionInfo) -> Self {
        Self {
            router: info.key.router_id,
            interface: info.key.interface_id,
            state: info.state,
            interval_ms: u64::try_from(info.interval.as_millis()).unwrap_or(u64::MAX),
            subscribers: info.subscribers,
        }
    }
}

/// GET /health
///
/// Reports "ok" while the engine accepts subscriptions, "stopping" after
/// shutdown has begun.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, code) = if state.registry.is_stopped().await {
        ("stopping", StatusCode::SERVICE_UNAVAILABLE)
    } else {
        ("ok", StatusCode::OK)
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.registry.active_sessions().await,
        subscribers: state.registry.subscriber_count().await,
        sessions: state
            .registry
            .sessions()
            .await
            .into_iter()
            .map(SessionSummary::from)
            .collect(),
    };

    (code, Json(response))
}
