// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health surface (§6, ambient): liveness always reports healthy once the
//! process is serving; readiness additionally requires a connected bus,
//! since subscribe/fan-out cannot function without one.
//!
//! Grounded on `transport/http.rs`'s `HealthResponse`/`health` handler,
//! split into the two-endpoint liveness/readiness shape this service needs.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::RelayState;

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub status: &'static str,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyChecks {
    pub bus: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ReadyChecks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus: Option<&'static str>,
}

/// `GET /health/live` — always reports healthy once the process is serving.
pub async fn live(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(LiveResponse { status: "ok", service: state.config.service_name.clone() })
}

/// `GET /health/ready` — 200 with bus/client counts when the bus is
/// connected, else 503 `degraded` (§6).
pub async fn ready(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    if state.bus.is_connected().await {
        let body = ReadyResponse {
            status: "ok",
            checks: Some(ReadyChecks { bus: "ok" }),
            clients: Some(state.client_count()),
            bus: None,
        };
        (StatusCode::OK, Json(body))
    } else {
        let body = ReadyResponse { status: "degraded", checks: None, clients: None, bus: Some("error") };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}
