// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Bus Client (§4.A): the relay's single outbound connection to the
//! message bus. Dials with backoff on startup and after any loss; nulls the
//! handle while disconnected so the readiness probe and `acquire` both see
//! `BusUnavailable` without blocking on a reconnect.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;

/// Handle to the single logical connection to the message bus.
pub struct BusClient {
    url: String,
    inner: RwLock<Option<async_nats::Client>>,
    shutdown: CancellationToken,
}

impl BusClient {
    pub fn new(url: String, shutdown: CancellationToken) -> Arc<Self> {
        Arc::new(Self { url, inner: RwLock::new(None), shutdown })
    }

    /// Spawn the background dial/reconnect loop. Backoff starts at `min` and
    /// doubles up to `max` on each failed or dropped connection.
    pub fn spawn_connect_loop(self: &Arc<Self>, min: std::time::Duration, max: std::time::Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.connect_loop(min, max).await });
    }

    async fn connect_loop(&self, min: std::time::Duration, max: std::time::Duration) {
        let mut backoff = min;
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match async_nats::ConnectOptions::new().connect(&self.url).await {
                Ok(client) => {
                    tracing::info!(url = %self.url, "bus connected");
                    *self.inner.write().await = Some(client.clone());
                    backoff = min;

                    // Poll connection state until it drops, then null the handle
                    // and fall through to the backoff/retry loop.
                    loop {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => return,
                            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
                                if !matches!(
                                    client.connection_state(),
                                    async_nats::connection::State::Connected
                                ) {
                                    tracing::warn!("bus connection lost, reconnecting");
                                    *self.inner.write().await = None;
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, backoff_ms = backoff.as_millis() as u64, "bus connect failed, retrying");
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(max);
        }
    }

    /// Current connectedness, for the readiness probe (§6) and `acquire`.
    pub async fn is_connected(&self) -> bool {
        match self.inner.read().await.as_ref() {
            Some(client) => {
                matches!(client.connection_state(), async_nats::connection::State::Connected)
            }
            None => false,
        }
    }

    /// Open a new upstream subscription for `pattern`. Fails with
    /// `BusUnavailable` while disconnected rather than blocking for a
    /// reconnect — the caller (Subscription Registry) informs the client
    /// but does not disconnect it (§4.D).
    pub async fn subscribe(&self, pattern: &str) -> Result<async_nats::Subscriber, RelayError> {
        let guard = self.inner.read().await;
        let client = guard.as_ref().ok_or(RelayError::BusUnavailable)?;
        client.subscribe(pattern.to_owned()).await.map_err(|e| {
            tracing::warn!(pattern, err = %e, "bus subscribe failed");
            RelayError::BusUnavailable
        })
    }

    /// Cancel an upstream subscription. The subscription's stream must
    /// complete after this returns (§4.A).
    pub async fn unsubscribe(&self, mut subscriber: async_nats::Subscriber) {
        if let Err(e) = subscriber.unsubscribe().await {
            tracing::debug!(err = %e, "bus unsubscribe failed (connection likely already gone)");
        }
    }
}

/// Payload parse-or-raw policy (§4.A): attempt structured JSON decode, fall
/// back to treating the payload as opaque text.
pub fn parse_payload(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
