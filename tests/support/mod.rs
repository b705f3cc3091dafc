// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only support for spinning up a real `nats-server` process.

use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

pub struct NatsServer {
    child: Child,
    port: u16,
}

impl NatsServer {
    /// Spawn a real `nats-server` on an ephemeral port. Returns `None`
    /// (never panics) if the binary is not on `$PATH` or never starts
    /// accepting connections, so dependent tests can skip gracefully.
    pub fn start() -> Option<Self> {
        let port = free_port()?;
        let child = Command::new("nats-server")
            .args(["-p", &port.to_string(), "-a", "127.0.0.1"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;

        let server = Self { child, port };
        if server.wait_until_accepting() {
            Some(server)
        } else {
            None
        }
    }

    pub fn url(&self) -> String {
        format!("nats://127.0.0.1:{}", self.port)
    }

    fn wait_until_accepting(&self) -> bool {
        for _ in 0..50 {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        false
    }
}

impl Drop for NatsServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> Option<u16> {
    std::net::TcpListener::bind("127.0.0.1:0").ok()?.local_addr().ok().map(|addr| addr.port())
}
