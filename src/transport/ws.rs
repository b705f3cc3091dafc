// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing WebSocket handler: runs the Admission Pipeline, then
//! drives one `ClientSession`'s dispatch loop for the life of the socket.
//!
//! Grounded on `transport/ws.rs`'s per-connection `tokio::select!` loop —
//! one branch drains the session's outbound channel onto the socket, the
//! other feeds inbound frames to the dispatcher — and on `validate_ws_query`
//! for lifting the bearer credential out of the upgrade query string
//! (browsers cannot set an `Authorization` header on a WebSocket handshake).
//! The query key is `auth.token`, the handshake field name documented for
//! the client protocol.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::admission::{self, Admitted};
use crate::state::RelayState;

#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "auth.token")]
    pub auth_token: Option<String>,
}

/// `GET /ws` — the client-facing WebSocket upgrade (§6).
pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    match admission::admit(Arc::clone(&state), query.auth_token).await {
        Ok(admitted) => ws.on_upgrade(move |socket| handle_ws(socket, admitted)).into_response(),
        Err(e) => {
            tracing::info!(error = %e, "admission rejected");
            axum::http::Response::builder()
                .status(e.http_status())
                .body(axum::body::Body::from(admission::rejection_frame(e)))
                .unwrap_or_default()
                .into_response()
        }
    }
}

async fn handle_ws(socket: WebSocket, admitted: Admitted) {
    let Admitted { session, mut outbound } = admitted;
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                match msg {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => session.dispatch(&text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    session.close().await;
}
