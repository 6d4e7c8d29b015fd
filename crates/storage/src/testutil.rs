//! Shared test utilities for recovery store testing.
//!
//! Feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! ```toml
//! [dev-dependencies]
//! twinpath-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::time::Duration;

use crate::{
    memory::{MemoryRecoveryStore, MemoryStoreConfig},
    types::SignedToken,
};

/// Create a deterministic fake token tagged with a task ID and sequence number.
///
/// Produces values like `"task3.tok042.sig"`. Useful for concurrent tests
/// where you need to identify which task wrote which binding.
#[must_use]
pub fn make_token(task: usize, seq: usize) -> SignedToken {
    SignedToken::from(format!("task{task}.tok{seq:03}.sig"))
}

/// Create a [`MemoryRecoveryStore`] whose bindings expire after `ttl`.
///
/// # Panics
///
/// Panics if `ttl` is zero.
#[must_use]
pub fn store_with_ttl(ttl: Duration) -> MemoryRecoveryStore {
    let config =
        MemoryStoreConfig::builder().binding_ttl(ttl).build().expect("ttl must be non-zero");
    MemoryRecoveryStore::with_config(config)
}
