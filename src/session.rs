// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Client Session (§4.F): one connected client's state — subscribed
//! patterns, open terminals, and the single dispatch loop that routes
//! `Inbound` frames to the Subscription Registry or Terminal Manager.
//! Malformed or out-of-shape frames are reported as a typed `error` event,
//! never a disconnect (§4.F, §7).
//!
//! Grounded on `transport/ws.rs`'s per-connection handler: one downstream
//! channel carries every outbound frame (fan-out events and terminal
//! events alike), written to by this session's own tasks and by the
//! Subscription Registry's reader tasks it has acquired memberships from.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::RelayError;
use crate::protocol::{Inbound, Outbound};
use crate::state::RelayState;
use crate::terminal::TerminalManager;

/// One connected client's session-scoped state.
pub struct ClientSession {
    pub client_id: String,
    pub user_id: String,
    pub roles: Vec<String>,
    credential: String,
    state: Arc<RelayState>,
    outbound: mpsc::Sender<Arc<str>>,
    subscriptions: Mutex<HashSet<String>>,
    terminals: TerminalManager,
}

impl ClientSession {
    /// Construct a session and its outbound channel. The caller is
    /// responsible for draining the returned receiver onto the client's
    /// transport (the WebSocket writer half).
    pub fn new(
        state: Arc<RelayState>,
        client_id: String,
        user_id: String,
        roles: Vec<String>,
        credential: String,
    ) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(state.config.send_queue_capacity);
        let terminals = TerminalManager::new(state.config.max_terminals, Arc::clone(&state.dialer), tx.clone());
        state.client_connected();
        let session = Self {
            client_id,
            user_id,
            roles,
            credential,
            state,
            outbound: tx,
            subscriptions: Mutex::new(HashSet::new()),
            terminals,
        };
        (session, rx)
    }

    /// Route one inbound client frame. Never returns an error to the
    /// caller — failures are reported in-band as typed events.
    pub async fn dispatch(&self, raw: &str) {
        let message = match Inbound::parse(raw) {
            Ok(message) => message,
            Err(reason) => {
                self.send(Outbound::error(reason));
                return;
            }
        };

        match message {
            Inbound::Subscribe { topic } => self.handle_subscribe(topic).await,
            Inbound::Unsubscribe { topic } => self.handle_unsubscribe(topic).await,
            Inbound::TerminalOpen { session_id } => self.handle_terminal_open(session_id).await,
            Inbound::TerminalInput { session_id, data } => self.terminals.input(&session_id, &data).await,
            Inbound::TerminalResize { session_id, cols, rows } => {
                self.terminals.resize(&session_id, cols, rows).await
            }
            Inbound::TerminalClose { session_id } => self.terminals.close(&session_id).await,
        }
    }

    async fn handle_subscribe(&self, topic: String) {
        match self.state.registry.acquire(&topic, &self.client_id, self.outbound.clone()).await {
            Ok(()) => {
                self.subscriptions.lock().await.insert(topic);
            }
            Err(RelayError::InvalidArgument) => self.send(Outbound::error("invalid topic pattern")),
            Err(e) => self.send(Outbound::error(e.to_string())),
        }
    }

    async fn handle_unsubscribe(&self, topic: String) {
        self.state.registry.release(&topic, &self.client_id).await;
        self.subscriptions.lock().await.remove(&topic);
    }

    async fn handle_terminal_open(&self, session_id: String) {
        match self.terminals.open(&session_id, &self.credential).await {
            Ok(()) => {}
            Err(RelayError::LimitExceeded) => {
                let message = format!("max {} concurrent terminals", self.state.config.max_terminals);
                self.send(Outbound::terminal_error(Some(session_id), message));
            }
            Err(e) => self.send(Outbound::terminal_error(Some(session_id), e.to_string())),
        }
    }

    fn send(&self, message: Outbound) {
        let text: Arc<str> = Arc::from(message.to_json());
        if self.outbound.try_send(text).is_err() {
            tracing::debug!(client_id = %self.client_id, "client send queue full or closed, dropping message");
        }
    }

    /// Release every held subscription membership and close every open
    /// terminal. Called once, at disconnect (§5 Cancellation).
    pub async fn close(&self) {
        let patterns: Vec<String> = self.subscriptions.lock().await.iter().cloned().collect();
        self.state.registry.release_all(&patterns, &self.client_id).await;
        self.terminals.close_all().await;
        self.state.client_disconnected();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
