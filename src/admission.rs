// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Admission Pipeline (§4.G): turns a raw bearer credential into an
//! admitted `ClientSession`, or a categorized rejection. Grounded on
//! `transport/auth.rs`'s bearer-extraction helpers, generalized from a
//! static shared-secret comparison to a call through the Identity Verifier.

use std::sync::Arc;

use crate::error::RelayError;
use crate::identity::Verdict;
use crate::protocol::Outbound;
use crate::session::ClientSession;
use crate::state::RelayState;

/// The outcome of successfully admitting a client.
pub struct Admitted {
    pub session: ClientSession,
    pub outbound: tokio::sync::mpsc::Receiver<Arc<str>>,
}

/// Run the admission pipeline for one incoming connection. `credential` is
/// the bearer token lifted from the WebSocket upgrade's `auth.token` query
/// parameter (browsers cannot set custom headers on a WS upgrade, so the
/// handshake field documented for the client protocol is carried there).
pub async fn admit(state: Arc<RelayState>, credential: Option<String>) -> Result<Admitted, RelayError> {
    let credential = credential.ok_or(RelayError::AuthRequired)?;

    match state.identity.verify(&credential).await {
        Ok(Verdict::Accepted { user_id, roles }) => {
            let client_id = uuid::Uuid::new_v4().to_string();
            let (session, outbound) =
                ClientSession::new(Arc::clone(&state), client_id, user_id, roles, credential);
            Ok(Admitted { session, outbound })
        }
        Ok(Verdict::Rejected) => Err(RelayError::AuthFailed),
        Err(e) => Err(e),
    }
}

/// Render a rejection as the close-handshake error frame (§7): the
/// connection is closed right after this is written, never left open.
pub fn rejection_frame(error: RelayError) -> String {
    Outbound::error(error.as_str()).to_json()
}
