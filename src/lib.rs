// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time relay: bridges client WebSocket sessions to a message bus
//! (subscribe/fan-out) and to per-session shell terminals proxied through a
//! C2 gateway.

pub mod admission;
pub mod bus;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod identity;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod state;
pub mod terminal;
pub mod transport;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::transport::build_router;

/// Run the relay until shutdown, honoring the configured grace period
/// before forcing process exit (§5).
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.service_port);
    let shutdown = CancellationToken::new();

    let grace = config.shutdown_grace();
    let state = RelayState::new(config, shutdown.clone());

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    tracing::info!(%addr, service = %state.config.service_name, "conduit-relay listening");

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    let serve_fut = axum::serve(listener, router).with_graceful_shutdown(shutdown.clone().cancelled_owned());

    tokio::select! {
        result = serve_fut => result?,
        () = grace_deadline(&shutdown, grace) => {
            tracing::warn!("shutdown grace period elapsed, forcing exit");
        }
    }

    Ok(())
}

async fn grace_deadline(shutdown: &CancellationToken, grace: std::time::Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(grace).await;
}
