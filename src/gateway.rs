// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Gateway Dialer (§4.B): opens an authenticated bidirectional byte
//! stream to the C2 gateway's shell endpoint for a given session id. The
//! dialer does not interpret bytes — that is the Terminal Manager's job.
//!
//! Grounded on `upstream/bridge.rs`'s `tokio_tungstenite::connect_async`
//! usage and `upstream/feed.rs`'s `http(s)://` → `ws(s)://` URL rewrite.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::RelayError;

type GatewaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type GatewaySink = SplitSink<GatewaySocket, Message>;
pub type GatewaySource = SplitStream<GatewaySocket>;

/// Opens shell sessions against the C2 gateway.
pub struct GatewayDialer {
    ws_base: String,
    timeout: std::time::Duration,
}

impl GatewayDialer {
    pub fn new(ws_base: String, timeout: std::time::Duration) -> Self {
        Self { ws_base, timeout }
    }

    /// `<GATEWAY_URL scheme-rewritten>/api/v1/c2/sessions/<session_id>/shell` (§6).
    pub fn shell_url(&self, session_id: &str) -> String {
        format!("{}/api/v1/c2/sessions/{session_id}/shell", self.ws_base)
    }

    /// Dial the gateway's shell endpoint for `session_id`, bearer-authenticated
    /// with the client's own credential (§3: retained for upstream dials).
    pub async fn dial(
        &self,
        session_id: &str,
        credential: &str,
    ) -> Result<(GatewaySink, GatewaySource), RelayError> {
        let url = self.shell_url(session_id);
        let mut request = url.into_client_request().map_err(|e| {
            tracing::warn!(session_id, err = %e, "invalid gateway shell URL");
            RelayError::UpstreamShellError
        })?;

        let header_value = format!("Bearer {credential}").parse().map_err(|e| {
            tracing::warn!(session_id, err = %e, "invalid bearer header value");
            RelayError::UpstreamShellError
        })?;
        request.headers_mut().insert("authorization", header_value);

        let connect = tokio_tungstenite::connect_async(request);
        let (stream, _response) = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| {
                tracing::warn!(session_id, "gateway dial timed out");
                RelayError::UpstreamShellError
            })?
            .map_err(|e| {
                tracing::warn!(session_id, err = %e, "gateway dial failed");
                RelayError::UpstreamShellError
            })?;

        Ok(stream.split())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_url_has_the_documented_shape() {
        let dialer = GatewayDialer::new("wss://gw.example.com".to_owned(), std::time::Duration::from_secs(1));
        assert_eq!(
            dialer.shell_url("sess-42"),
            "wss://gw.example.com/api/v1/c2/sessions/sess-42/shell"
        );
    }
}
