// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for the relay, per-request and handshake-scoped alike.
//!
//! `RelayError` covers both: handshake-time kinds close the connection with
//! a matching close code, while per-request kinds are reported as a typed
//! `error` / `terminal.error` event and leave the connection open.

use std::fmt;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error kinds for the relay, spanning handshake and per-request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayError {
    /// Handshake carried no bearer credential.
    AuthRequired,
    /// Identity verifier returned a definite rejection (401/403).
    AuthFailed,
    /// Identity verifier was unreachable or errored transiently.
    AuthTransient,
    /// Malformed or unparsable request payload.
    InvalidArgument,
    /// `MAX_TERMINALS` already reached for this client session.
    LimitExceeded,
    /// `terminal.open` for a `session_id` already present.
    AlreadyOpen,
    /// Operation referenced a `session_id` that does not exist.
    UnknownTarget,
    /// Subscription acquire failed because the bus is disconnected.
    BusUnavailable,
    /// Gateway dial or stream failure for an open terminal.
    UpstreamShellError,
    /// Transport-level failure of the client connection.
    Fatal,
}

impl RelayError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthRequired => 401,
            Self::AuthFailed => 401,
            Self::AuthTransient => 502,
            Self::InvalidArgument => 400,
            Self::LimitExceeded => 409,
            Self::AlreadyOpen => 409,
            Self::UnknownTarget => 404,
            Self::BusUnavailable => 503,
            Self::UpstreamShellError => 502,
            Self::Fatal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRequired => "authentication_required",
            Self::AuthFailed => "authentication_failed",
            Self::AuthTransient => "authentication_error",
            Self::InvalidArgument => "invalid_argument",
            Self::LimitExceeded => "limit_exceeded",
            Self::AlreadyOpen => "already_open",
            Self::UnknownTarget => "unknown_target",
            Self::BusUnavailable => "bus_unavailable",
            Self::UpstreamShellError => "upstream_shell_error",
            Self::Fatal => "fatal",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(&self, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_kinds_map_to_distinct_codes() {
        assert_eq!(RelayError::AuthRequired.as_str(), "authentication_required");
        assert_eq!(RelayError::AuthFailed.as_str(), "authentication_failed");
        assert_eq!(RelayError::AuthTransient.as_str(), "authentication_error");
    }

    #[test]
    fn bus_unavailable_is_service_unavailable() {
        assert_eq!(RelayError::BusUnavailable.http_status(), 503);
    }
}
