// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;

use super::*;
use crate::bus::BusClient;

fn disconnected_registry() -> SubscriptionRegistry {
    let bus = BusClient::new("nats://127.0.0.1:1".to_owned(), CancellationToken::new());
    SubscriptionRegistry::new(bus)
}

#[test]
fn pattern_validation_rejects_disallowed_characters() {
    assert!(validate_pattern("a.b.*").is_ok());
    assert!(validate_pattern("a.b.>").is_ok());
    assert!(validate_pattern("a_b.c123").is_ok());
    assert!(validate_pattern("bad pattern!").is_err());
    assert!(validate_pattern("").is_err());
}

#[tokio::test]
async fn release_on_unheld_pattern_is_a_no_op() {
    let registry = disconnected_registry();
    // Must not panic or error; no entry exists either before or after.
    registry.release("never.held", "client-1").await;
    assert_eq!(registry.refcount("never.held").await, 0);
}

#[tokio::test]
async fn acquire_fails_with_bus_unavailable_while_disconnected() {
    let registry = disconnected_registry();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);

    let err = registry.acquire("x", "client-1", tx).await.unwrap_err();
    assert_eq!(err, RelayError::BusUnavailable);
    // A failed acquire must not leave a stray entry behind.
    assert_eq!(registry.refcount("x").await, 0);
}

#[tokio::test]
async fn acquire_with_invalid_pattern_never_touches_the_bus() {
    let registry = disconnected_registry();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);

    // Even though the bus is unreachable, an invalid pattern must fail on
    // shape alone (InvalidArgument), not BusUnavailable.
    let err = registry.acquire("bad pattern!", "client-1", tx).await.unwrap_err();
    assert_eq!(err, RelayError::InvalidArgument);
}
