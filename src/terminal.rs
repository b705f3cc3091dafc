// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Terminal Manager (§4.E): the per-Client-Session Shell Proxy table.
//! Each proxy owns exactly one Gateway Dialer connection and pipes raw bytes
//! between it and the client, tagged by `session_id`. Bounded to
//! `MAX_TERMINALS` live proxies per client.
//!
//! Grounded on `upstream/bridge.rs`'s `WsBridge` — generalized from "one
//! upstream stream shared by many clients" to "one upstream stream owned by
//! one client", and from connection-wide framing to per-terminal framing.
//! As in `bridge.rs`, a proxy's write half is touched only by the owning
//! Client Session's single dispatch task (§5: "driven synchronously by
//! inbound client messages"); the `tokio::sync::Mutex` around it exists for
//! `Send`-across-await bookkeeping, not for real contention.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::error::RelayError;
use crate::gateway::{GatewayDialer, GatewaySink, GatewaySource};
use crate::protocol::Outbound;

/// One Shell Proxy slot. Present in the table iff the proxy is in
/// `Dialing`, `Ready`, or mid-`Closing` (§4.E invariant); removed once
/// `Closed`.
struct TerminalSlot {
    write: Mutex<Option<GatewaySink>>,
    ready: AtomicBool,
}

/// Bounded per-client table of live Shell Proxies.
pub struct TerminalManager {
    max_terminals: usize,
    dialer: Arc<GatewayDialer>,
    terminals: Arc<Mutex<HashMap<String, Arc<TerminalSlot>>>>,
    outbound: mpsc::Sender<Arc<str>>,
}

impl TerminalManager {
    pub fn new(max_terminals: usize, dialer: Arc<GatewayDialer>, outbound: mpsc::Sender<Arc<str>>) -> Self {
        Self { max_terminals, dialer, terminals: Arc::new(Mutex::new(HashMap::new())), outbound }
    }

    /// `terminal.open`: admit a new Shell Proxy and begin dialing it in the
    /// background. Returns once the slot is reserved, not once it is ready —
    /// `terminal.ready` follows asynchronously (§4.E).
    pub async fn open(&self, session_id: &str, credential: &str) -> Result<(), RelayError> {
        if session_id.is_empty() {
            return Err(RelayError::InvalidArgument);
        }

        let mut terminals = self.terminals.lock().await;
        if terminals.len() >= self.max_terminals {
            return Err(RelayError::LimitExceeded);
        }
        if terminals.contains_key(session_id) {
            return Err(RelayError::AlreadyOpen);
        }

        let slot = Arc::new(TerminalSlot { write: Mutex::new(None), ready: AtomicBool::new(false) });
        terminals.insert(session_id.to_owned(), Arc::clone(&slot));
        drop(terminals);

        let dialer = Arc::clone(&self.dialer);
        let terminals_table = Arc::clone(&self.terminals);
        let outbound = self.outbound.clone();
        let session_id = session_id.to_owned();
        let credential = credential.to_owned();

        tokio::spawn(async move {
            run_dial(session_id, credential, dialer, slot, terminals_table, outbound).await;
        });

        Ok(())
    }

    /// `terminal.input`: write `data` to the upstream stream. Silently
    /// ignored if `session_id` is unknown or not yet `Ready` (§4.E).
    pub async fn input(&self, session_id: &str, data: &str) {
        let Some(slot) = self.terminals.lock().await.get(session_id).cloned() else { return };
        if !slot.ready.load(Ordering::Acquire) {
            return;
        }
        let mut guard = slot.write.lock().await;
        if let Some(sink) = guard.as_mut() {
            if let Err(e) = sink.send(Message::Binary(data.as_bytes().to_vec().into())).await {
                tracing::debug!(session_id, err = %e, "terminal write failed");
            }
        }
    }

    /// `terminal.resize`: send the single in-band structured-text control
    /// frame documented in §4.E. Ignored if unknown or not `Ready`.
    pub async fn resize(&self, session_id: &str, cols: u16, rows: u16) {
        let Some(slot) = self.terminals.lock().await.get(session_id).cloned() else { return };
        if !slot.ready.load(Ordering::Acquire) {
            return;
        }
        let frame = serde_json::json!({"type": "resize", "cols": cols, "rows": rows}).to_string();
        let mut guard = slot.write.lock().await;
        if let Some(sink) = guard.as_mut() {
            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                tracing::debug!(session_id, err = %e, "terminal resize failed");
            }
        }
    }

    /// `terminal.close`: request upstream close and remove the slot
    /// immediately. The background reader's subsequent `on_close` is still
    /// delivered to the client but is a no-op against the table (§4.E).
    pub async fn close(&self, session_id: &str) {
        let Some(slot) = self.terminals.lock().await.remove(session_id) else { return };
        let mut guard = slot.write.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink.close().await;
        }
    }

    /// Every `session_id` currently occupying a slot, for disconnect
    /// teardown (§5).
    pub async fn open_session_ids(&self) -> Vec<String> {
        self.terminals.lock().await.keys().cloned().collect()
    }

    /// Close every live proxy. Used at Client Session teardown.
    pub async fn close_all(&self) {
        let ids = self.open_session_ids().await;
        for id in ids {
            self.close(&id).await;
        }
    }
}

async fn run_dial(
    session_id: String,
    credential: String,
    dialer: Arc<GatewayDialer>,
    slot: Arc<TerminalSlot>,
    terminals: Arc<Mutex<HashMap<String, Arc<TerminalSlot>>>>,
    outbound: mpsc::Sender<Arc<str>>,
) {
    match dialer.dial(&session_id, &credential).await {
        Ok((write, read)) => {
            let still_open = {
                let guard = terminals.lock().await;
                guard.get(&session_id).is_some_and(|current| Arc::ptr_eq(current, &slot))
            };
            if !still_open {
                // Closed by the client while the dial was in flight; drop the
                // freshly established connection without emitting anything.
                let mut write = write;
                let _ = write.close().await;
                return;
            }

            *slot.write.lock().await = Some(write);
            slot.ready.store(true, Ordering::Release);
            send(&outbound, Outbound::terminal_ready(session_id.clone()));

            run_reader(session_id, read, terminals, outbound).await;
        }
        Err(e) => {
            terminals.lock().await.remove(&session_id);
            send(&outbound, Outbound::terminal_error(Some(session_id), e.to_string()));
        }
    }
}

async fn run_reader(
    session_id: String,
    mut read: GatewaySource,
    terminals: Arc<Mutex<HashMap<String, Arc<TerminalSlot>>>>,
    outbound: mpsc::Sender<Arc<str>>,
) {
    loop {
        match read.next().await {
            Some(Ok(Message::Binary(bytes))) => {
                let data = String::from_utf8_lossy(&bytes).into_owned();
                send(&outbound, Outbound::TerminalData { session_id: session_id.clone(), data });
            }
            Some(Ok(Message::Text(text))) => {
                send(&outbound, Outbound::TerminalData { session_id: session_id.clone(), data: text.to_string() });
            }
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| i32::from(u16::from(f.code))).unwrap_or(1000);
                terminals.lock().await.remove(&session_id);
                send(&outbound, Outbound::TerminalClosed { session_id, code });
                return;
            }
            Some(Ok(_)) => {} // ping/pong/frame carry no terminal payload
            Some(Err(e)) => {
                terminals.lock().await.remove(&session_id);
                send(&outbound, Outbound::terminal_error(Some(session_id), e.to_string()));
                return;
            }
            None => {
                terminals.lock().await.remove(&session_id);
                send(&outbound, Outbound::TerminalClosed { session_id, code: 1000 });
                return;
            }
        }
    }
}

fn send(outbound: &mpsc::Sender<Arc<str>>, message: Outbound) {
    let text: Arc<str> = Arc::from(message.to_json());
    if outbound.try_send(text).is_err() {
        tracing::debug!("client send queue full or closed, dropping terminal event");
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
