// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing wire protocol: the tagged inbound/outbound envelope from
//! spec §6. `data` on `event` is opportunistically structured-or-raw (§4.A) —
//! callers must accept either a JSON object or a string.

use serde::{Deserialize, Serialize};

/// A message received from a connected client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Inbound {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },
    #[serde(rename = "terminal.open")]
    TerminalOpen { session_id: String },
    #[serde(rename = "terminal.input")]
    TerminalInput { session_id: String, data: String },
    #[serde(rename = "terminal.resize")]
    TerminalResize { session_id: String, cols: u16, rows: u16 },
    #[serde(rename = "terminal.close")]
    TerminalClose { session_id: String },
}

impl Inbound {
    /// Parse a raw client frame, returning a distinct error string (not a
    /// disconnect) for malformed tags or shapes, per §4.F.
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str::<Inbound>(raw).map_err(|e| format!("invalid message: {e}"))
    }
}

/// A message sent to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Outbound {
    #[serde(rename = "event")]
    Event { topic: String, data: serde_json::Value },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "terminal.ready")]
    TerminalReady { session_id: String, status: &'static str },
    #[serde(rename = "terminal.data")]
    TerminalData { session_id: String, data: String },
    #[serde(rename = "terminal.closed")]
    TerminalClosed { session_id: String, code: i32 },
    #[serde(rename = "terminal.error")]
    TerminalError {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        message: String,
    },
}

impl Outbound {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn terminal_ready(session_id: impl Into<String>) -> Self {
        Self::TerminalReady { session_id: session_id.into(), status: "connected" }
    }

    pub fn terminal_error(session_id: Option<String>, message: impl Into<String>) -> Self {
        Self::TerminalError { session_id, message: message.into() }
    }

    /// Serialize to the wire JSON text sent over the client socket.
    pub fn to_json(&self) -> String {
        // The enum's shape is always valid JSON; fall back defensively rather
        // than panicking on an unexpected serialization failure.
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"internal serialization failure"}"#.to_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscribe() {
        let msg = Inbound::parse(r#"{"type":"subscribe","topic":"a.b.*"}"#).unwrap();
        assert!(matches!(msg, Inbound::Subscribe { topic } if topic == "a.b.*"));
    }

    #[test]
    fn parses_terminal_resize() {
        let msg =
            Inbound::parse(r#"{"type":"terminal.resize","session_id":"s1","cols":80,"rows":24}"#)
                .unwrap();
        assert!(matches!(
            msg,
            Inbound::TerminalResize { session_id, cols: 80, rows: 24 } if session_id == "s1"
        ));
    }

    #[test]
    fn rejects_unknown_tag_without_panicking() {
        assert!(Inbound::parse(r#"{"type":"bogus"}"#).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        assert!(Inbound::parse(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn event_data_accepts_string_or_object() {
        let obj = Outbound::Event {
            topic: "a.b.c".into(),
            data: serde_json::json!({"n": 1}),
        };
        assert_eq!(obj.to_json(), r#"{"type":"event","topic":"a.b.c","data":{"n":1}}"#);

        let raw = Outbound::Event { topic: "a.b.c".into(), data: serde_json::Value::String("raw".into()) };
        assert_eq!(raw.to_json(), r#"{"type":"event","topic":"a.b.c","data":"raw"}"#);
    }

    #[test]
    fn terminal_ready_status_is_connected() {
        let msg = Outbound::terminal_ready("s1");
        assert_eq!(msg.to_json(), r#"{"type":"terminal.ready","session_id":"s1","status":"connected"}"#);
    }
}
