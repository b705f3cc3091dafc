// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the relay.

pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::health;
use crate::state::RelayState;

/// Build the axum `Router` serving the client-facing WebSocket and the
/// health surface (§6).
pub fn build_router(state: Arc<RelayState>) -> Router {
    let origins: Vec<_> = state
        .config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods([axum::http::Method::GET]);

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .with_state(state)
}
