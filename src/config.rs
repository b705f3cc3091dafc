// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the relay service.
#[derive(Debug, Clone, clap::Parser)]
pub struct RelayConfig {
    /// Service identity, used in logs and the health response.
    #[arg(long, default_value = "conduit-relay", env = "SERVICE_NAME")]
    pub service_name: String,

    /// Listener port.
    #[arg(long, default_value_t = 3009, env = "SERVICE_PORT")]
    pub service_port: u16,

    /// Message bus (NATS) endpoint.
    #[arg(long, default_value = "nats://127.0.0.1:4222", env = "BUS_URL")]
    pub bus_url: String,

    /// C2 gateway base URL (scheme rewritten to ws(s) for the shell path).
    #[arg(long, default_value = "http://127.0.0.1:8088", env = "GATEWAY_URL")]
    pub gateway_url: String,

    /// Identity service verification endpoint.
    #[arg(
        long,
        default_value = "http://identity.internal/api/v1/verify",
        env = "IDENTITY_VERIFY_URL"
    )]
    pub identity_verify_url: String,

    /// Comma-separated CORS allow-list.
    #[arg(long, default_value = "http://localhost:18080", env = "ALLOWED_ORIGINS")]
    pub allowed_origins: String,

    /// Maximum concurrent terminals per client session.
    #[arg(long, default_value_t = 3, env = "MAX_TERMINALS")]
    pub max_terminals: usize,

    /// Per-client outbound send-queue capacity. Fan-out and terminal events
    /// are sent with a non-blocking `try_send`; once a client's queue is
    /// full, the next message for that client is dropped (logged at debug)
    /// rather than stalling the registry reader task or any other client.
    #[arg(long, default_value_t = 256, env = "SEND_QUEUE_CAPACITY")]
    pub send_queue_capacity: usize,

    /// Floor for bus reconnect backoff (design floor: retry at >= 5s).
    #[arg(long, default_value_t = 5_000, env = "BUS_RECONNECT_MIN_MS")]
    pub bus_reconnect_min_ms: u64,

    /// Ceiling for bus reconnect backoff.
    #[arg(long, default_value_t = 30_000, env = "BUS_RECONNECT_MAX_MS")]
    pub bus_reconnect_max_ms: u64,

    /// Timeout for identity-verify HTTP calls and gateway dial attempts.
    #[arg(long, default_value_t = 10_000, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Grace period for process-level shutdown before a hard exit.
    #[arg(long, default_value_t = 10_000, env = "SHUTDOWN_GRACE_MS")]
    pub shutdown_grace_ms: u64,
}

impl RelayConfig {
    pub fn bus_reconnect_min(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bus_reconnect_min_ms)
    }

    pub fn bus_reconnect_max(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bus_reconnect_max_ms)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Parsed, trimmed CORS origin list.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Rewrite `GATEWAY_URL`'s scheme to ws(s) for the shell endpoint.
    pub fn gateway_ws_base(&self) -> String {
        if let Some(rest) = self.gateway_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.gateway_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.gateway_url.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_parse_with_no_args() {
        let config = RelayConfig::parse_from(["conduit-relay"]);
        assert_eq!(config.service_port, 3009);
        assert_eq!(config.max_terminals, 3);
    }

    #[test]
    fn gateway_ws_base_rewrites_scheme() {
        let mut config = RelayConfig::parse_from(["conduit-relay"]);
        config.gateway_url = "https://gateway.example.com".to_owned();
        assert_eq!(config.gateway_ws_base(), "wss://gateway.example.com");

        config.gateway_url = "http://gateway.example.com".to_owned();
        assert_eq!(config.gateway_ws_base(), "ws://gateway.example.com");
    }

    #[test]
    fn allowed_origins_splits_and_trims() {
        let mut config = RelayConfig::parse_from(["conduit-relay"]);
        config.allowed_origins = " http://a.test , http://b.test".to_owned();
        assert_eq!(config.allowed_origins(), vec!["http://a.test", "http://b.test"]);
    }
}
