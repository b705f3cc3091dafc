// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Identity Verifier (§4.C): exchanges a client's bearer credential for
//! the identity the rest of the relay trusts. Grounded on
//! `upstream/client.rs`'s `reqwest::Client` wrapper, adapted from
//! JSON-body responses to header-carried identity (`x-user-id`,
//! `x-user-roles`).

use reqwest::{Client, StatusCode};

use crate::error::RelayError;

/// Result of verifying a client's credential against the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { user_id: String, roles: Vec<String> },
    Rejected,
}

/// Calls the configured identity service on the relay's behalf (§4.C).
pub struct IdentityVerifier {
    url: String,
    client: Client,
}

impl IdentityVerifier {
    pub fn new(url: String, timeout: std::time::Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { url, client }
    }

    /// Verify `credential`. A `TransientError` is reported as
    /// `RelayError::AuthTransient` so the admission pipeline can distinguish
    /// "rejected" from "could not be checked" (§7).
    pub async fn verify(&self, credential: &str) -> Result<Verdict, RelayError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "identity verifier unreachable");
                RelayError::AuthTransient
            })?;

        match response.status() {
            StatusCode::OK => {
                let user_id = header_str(&response, "x-user-id").ok_or_else(|| {
                    tracing::warn!("identity verifier accepted without x-user-id header");
                    RelayError::AuthTransient
                })?;
                let roles = header_str(&response, "x-user-roles")
                    .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
                    .unwrap_or_default();
                Ok(Verdict::Accepted { user_id, roles })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(Verdict::Rejected),
            status => {
                tracing::warn!(%status, "identity verifier returned an unexpected status");
                Err(RelayError::AuthTransient)
            }
        }
    }
}

fn header_str(response: &reqwest::Response, name: &str) -> Option<String> {
    response.headers().get(name)?.to_str().ok().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_carries_user_id_and_roles() {
        let verdict = Verdict::Accepted { user_id: "u1".into(), roles: vec!["admin".into()] };
        assert_eq!(
            verdict,
            Verdict::Accepted { user_id: "u1".to_owned(), roles: vec!["admin".to_owned()] }
        );
    }
}
