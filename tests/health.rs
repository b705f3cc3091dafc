// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-surface integration tests, using the same `axum_test::TestServer`
//! style as this workspace's other integration tests.

use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use conduit_relay::config::RelayConfig;
use conduit_relay::state::RelayState;
use conduit_relay::transport::build_router;

fn test_state() -> Arc<RelayState> {
    let mut config = RelayConfig::parse_from(["conduit-relay"]);
    config.bus_url = "nats://127.0.0.1:1".to_owned();
    RelayState::new(config, CancellationToken::new())
}

#[tokio::test]
async fn liveness_is_always_ok() {
    let server = axum_test::TestServer::new(build_router(test_state())).expect("create test server");
    let resp = server.get("/health/live").await;
    resp.assert_status(StatusCode::OK);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readiness_is_degraded_without_a_connected_bus() {
    let server = axum_test::TestServer::new(build_router(test_state())).expect("create test server");
    let resp = server.get("/health/ready").await;
    resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["bus"], "error");
}

#[tokio::test]
async fn a_plain_get_to_the_ws_route_is_rejected_before_admission() {
    // No `Connection: upgrade` / `Upgrade: websocket` headers, so axum's
    // own `WebSocketUpgrade` extractor rejects the request before the
    // admission pipeline ever runs.
    let server = axum_test::TestServer::new(build_router(test_state())).expect("create test server");
    let resp = server.get("/ws").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}
