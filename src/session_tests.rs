// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::config::RelayConfig;

fn test_state() -> Arc<RelayState> {
    let mut config = RelayConfig::parse_from(["conduit-relay"]);
    config.bus_url = "nats://127.0.0.1:1".to_owned();
    config.gateway_url = "http://127.0.0.1:1".to_owned();
    config.request_timeout_ms = 50;
    RelayState::new(config, CancellationToken::new())
}

fn test_session() -> (ClientSession, mpsc::Receiver<Arc<str>>) {
    ClientSession::new(test_state(), "client-1".into(), "user-1".into(), vec![], "cred".into())
}

#[tokio::test]
async fn malformed_frame_yields_an_error_event_not_a_panic() {
    let (session, mut rx) = test_session();
    session.dispatch("not json").await;
    let text = rx.try_recv().unwrap();
    assert!(text.contains(r#""type":"error""#));
}

#[tokio::test]
async fn subscribe_with_invalid_pattern_is_reported_without_touching_the_bus() {
    let (session, mut rx) = test_session();
    session.dispatch(r#"{"type":"subscribe","topic":"bad pattern!"}"#).await;
    let text = rx.try_recv().unwrap();
    assert!(text.contains("invalid topic pattern"));
}

#[tokio::test]
async fn reopening_an_already_open_terminal_reports_already_open() {
    let (session, mut rx) = test_session();
    session.dispatch(r#"{"type":"terminal.open","session_id":"s1"}"#).await;
    session.dispatch(r#"{"type":"terminal.open","session_id":"s1"}"#).await;

    let text = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .expect("expected a message before the timeout")
        .expect("channel should not be closed");
    assert!(text.contains("already_open"));
}

#[tokio::test]
async fn terminal_open_beyond_the_cap_reports_the_documented_message() {
    let (session, mut rx) = test_session();
    for id in ["s1", "s2", "s3"] {
        session.dispatch(&format!(r#"{{"type":"terminal.open","session_id":"{id}"}}"#)).await;
    }
    session.dispatch(r#"{"type":"terminal.open","session_id":"s4"}"#).await;

    let text = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .expect("expected a message before the timeout")
        .expect("channel should not be closed");
    assert!(text.contains("max 3 concurrent terminals"));
}

#[tokio::test]
async fn close_on_an_idle_session_is_a_no_op() {
    let (session, _rx) = test_session();
    session.close().await;
}
