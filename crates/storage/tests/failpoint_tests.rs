#![allow(clippy::expect_used, clippy::panic)]
//! Integration tests for fail-point injection in the storage crate.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p twinpath-storage --features failpoints --test failpoint_tests
//! ```

use twinpath_storage::{MemoryRecoveryStore, RecoveryStore, SignedToken, StorageError};

#[tokio::test]
async fn put_failpoint_reports_exhaustion() {
    let scenario = fail::FailScenario::setup();
    let store = MemoryRecoveryStore::new();

    fail::cfg("recovery-store-before-put", "return").expect("failed to configure fail point");

    let result = store.put(SignedToken::from("t")).await;
    assert!(
        matches!(result, Err(StorageError::StoreExhausted { .. })),
        "put should fail when fail point is active"
    );
    assert!(store.is_empty().await.expect("len"), "nothing may be bound on failure");

    scenario.teardown();
}

#[tokio::test]
async fn put_without_failpoint_succeeds() {
    let scenario = fail::FailScenario::setup();
    let store = MemoryRecoveryStore::new();

    let result = store.put(SignedToken::from("t")).await;
    assert!(result.is_ok(), "put should succeed without fail point");

    scenario.teardown();
}
