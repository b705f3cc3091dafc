// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide shared state, assembled once in `lib::run` and handed to
//! every Client Session. Grounded on `MuxState`'s shape: one struct bundling
//! config, shutdown token, and the long-lived shared subsystems.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use tokio_util::sync::CancellationToken;

use crate::bus::BusClient;
use crate::config::RelayConfig;
use crate::gateway::GatewayDialer;
use crate::identity::IdentityVerifier;
use crate::registry::SubscriptionRegistry;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the process-wide rustls crypto provider. Needed before the first
/// `reqwest` client is built, since the crate opts out of rustls's default
/// provider selection (`rustls-no-provider`).
fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Shared relay state: the Bus Client, the Subscription Registry, the
/// Identity Verifier, and the Gateway Dialer factory, plus process-wide
/// config and the shutdown token every background task watches.
pub struct RelayState {
    pub config: RelayConfig,
    pub shutdown: CancellationToken,
    pub bus: Arc<BusClient>,
    pub registry: SubscriptionRegistry,
    pub identity: IdentityVerifier,
    pub dialer: Arc<GatewayDialer>,
    clients: AtomicUsize,
}

impl RelayState {
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Arc<Self> {
        ensure_crypto_provider();

        let bus = BusClient::new(config.bus_url.clone(), shutdown.clone());
        bus.spawn_connect_loop(config.bus_reconnect_min(), config.bus_reconnect_max());

        let registry = SubscriptionRegistry::new(Arc::clone(&bus));
        let identity = IdentityVerifier::new(config.identity_verify_url.clone(), config.request_timeout());
        let dialer = Arc::new(GatewayDialer::new(config.gateway_ws_base(), config.request_timeout()));

        Arc::new(Self { config, shutdown, bus, registry, identity, dialer, clients: AtomicUsize::new(0) })
    }

    /// Record a newly admitted Client Session, for the `/health/ready`
    /// `clients` count (§6).
    pub fn client_connected(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a torn-down Client Session.
    pub fn client_disconnected(&self) {
        self.clients.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current count of connected Client Sessions.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }
}
