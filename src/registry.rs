// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Subscription Registry (§4.D): process-wide map from bus subject
//! pattern to {upstream handle, reference count, client set}. Guarantees
//! at-most-one upstream subscription per distinct pattern and drives fan-out.
//!
//! Grounded on `upstream/bridge.rs`'s `HashMap<client_id, Sender<Arc<str>>>`
//! client-slot map, generalized from "one bridge per session" to "one
//! reader task per subject pattern". As in `bridge.rs`, fan-out messages
//! are pre-serialized once to `Arc<str>` and
//! handed to each member's channel via `try_send` — a full or closed queue
//! never blocks the reader task (§5: registry operations must not suspend
//! while holding the exclusion primitive).

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::bus::{parse_payload, BusClient};
use crate::error::RelayError;
use crate::protocol::Outbound;

/// One subscription entry: the set of client sessions currently holding a
/// membership, keyed by `client_id`. `refcount` is always `members.len()`.
struct Entry {
    members: HashMap<String, mpsc::Sender<Arc<str>>>,
    cancel: CancellationToken,
}

/// Process-wide subscription registry, shared by every Client Session.
pub struct SubscriptionRegistry {
    bus: Arc<BusClient>,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

/// Accept only patterns matching `[A-Za-z0-9._*>]+` (§4.D). Rejected without
/// ever touching the bus.
pub fn validate_pattern(pattern: &str) -> Result<(), RelayError> {
    let valid = !pattern.is_empty()
        && pattern.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '*' | '>'));
    if valid {
        Ok(())
    } else {
        Err(RelayError::InvalidArgument)
    }
}

impl SubscriptionRegistry {
    pub fn new(bus: Arc<BusClient>) -> Self {
        Self { bus, entries: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Acquire a membership in `pattern` for `client_id`, opening a new
    /// upstream subscription if none exists yet (§4.D Acquire).
    ///
    /// Idempotent per client: a second `acquire` for a pattern the client
    /// already holds leaves refcount unchanged.
    pub async fn acquire(
        &self,
        pattern: &str,
        client_id: &str,
        sender: mpsc::Sender<Arc<str>>,
    ) -> Result<(), RelayError> {
        validate_pattern(pattern)?;

        {
            let mut entries = self.entries.lock().await;
            if let Some(entry) = entries.get_mut(pattern) {
                entry.members.entry(client_id.to_owned()).or_insert(sender);
                return Ok(());
            }
        }

        // Upstream I/O happens outside the critical section (§5).
        let subscriber = self.bus.subscribe(pattern).await?;

        let cancel = CancellationToken::new();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(pattern) {
            // Lost the race: another acquire created the entry first.
            entry.members.entry(client_id.to_owned()).or_insert(sender);
            drop(entries);
            self.bus.unsubscribe(subscriber).await;
            return Ok(());
        }

        let mut members = HashMap::new();
        members.insert(client_id.to_owned(), sender);
        entries.insert(pattern.to_owned(), Entry { members, cancel: cancel.clone() });
        drop(entries);

        self.spawn_reader(pattern.to_owned(), subscriber, cancel);
        Ok(())
    }

    /// Release `client_id`'s membership in `pattern`. A no-op if the client
    /// does not hold it — `unsubscribe` on a pattern not held never errors
    /// (§8 round-trip law).
    pub async fn release(&self, pattern: &str, client_id: &str) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(pattern) else { return };
        entry.members.remove(client_id);
        if entry.members.is_empty() {
            if let Some(entry) = entries.remove(pattern) {
                entry.cancel.cancel();
            }
        }
    }

    /// Release every pattern membership `client_id` holds. Used at
    /// disconnect teardown (§5 Cancellation).
    pub async fn release_all(&self, patterns: &[String], client_id: &str) {
        for pattern in patterns {
            self.release(pattern, client_id).await;
        }
    }

    /// Current refcount for `pattern`, or 0 if no entry exists. Exposed for
    /// the §8 invariants.
    pub async fn refcount(&self, pattern: &str) -> usize {
        self.entries.lock().await.get(pattern).map(|e| e.members.len()).unwrap_or(0)
    }

    fn spawn_reader(&self, pattern: String, subscriber: async_nats::Subscriber, cancel: CancellationToken) {
        let entries = Arc::clone(&self.entries);
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move { run_reader(pattern, subscriber, cancel, entries, bus).await });
    }
}

/// Drains one upstream subscription and fans incoming messages out to the
/// entry's current member set. Per-pattern ordering to a single client is
/// preserved because this loop processes one message at a time in arrival
/// order; cross-pattern ordering is never guaranteed (§5).
async fn run_reader(
    pattern: String,
    mut subscriber: async_nats::Subscriber,
    cancel: CancellationToken,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    bus: Arc<BusClient>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = subscriber.next() => {
                let Some(msg) = msg else { break };
                let parsed = parse_payload(&msg.payload);
                let outbound = Outbound::Event { topic: msg.subject.to_string(), data: parsed };
                let text: Arc<str> = Arc::from(outbound.to_json());

                let recipients: Vec<mpsc::Sender<Arc<str>>> = {
                    let guard = entries.lock().await;
                    match guard.get(&pattern) {
                        Some(entry) => entry.members.values().cloned().collect(),
                        None => break,
                    }
                };
                for sender in recipients {
                    if sender.try_send(Arc::clone(&text)).is_err() {
                        tracing::debug!(pattern = %pattern, "client send queue full or closed, dropping fan-out message");
                    }
                }
            }
        }
    }
    bus.unsubscribe(subscriber).await;
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
