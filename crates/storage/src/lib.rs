//! Recovery-key storage for Twinpath.
//!
//! This crate provides the [`RecoveryStore`] trait and its in-process
//! implementation, [`MemoryRecoveryStore`]. The store is the server-side anchor
//! of the validator channel: it maps an opaque [`RecoveryKey`] (emitted as an
//! `ETag` and echoed back via `If-None-Match`) to the last [`SignedToken`]
//! issued under that key.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    twinpath-server                          │
//! │        (cookie + ETag extraction, content negotiation)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    twinpath-authn                           │
//! │      ReconciliationEngine  │  TokenCodec (HS256 JWT)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    twinpath-storage                         │
//! │             RecoveryStore trait (put, get, replace)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   MemoryRecoveryStore                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use twinpath_storage::{MemoryRecoveryStore, RecoveryKey, RecoveryStore, SignedToken};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryRecoveryStore::new();
//!
//!     let key = store.put(SignedToken::from("header.payload.sig")).await?;
//!     assert_eq!(store.get(&key).await?, Some(SignedToken::from("header.payload.sig")));
//!
//!     // Unknown keys are a normal miss, not an error.
//!     assert_eq!(store.get(&RecoveryKey::from("stale")).await?, None);
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers.
//! - **`failpoints`**: Activates the `recovery-store-before-put` fail point.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::RecoveryStore;
pub use error::{ConfigError, StorageError, StorageResult};
pub use memory::{
    DEFAULT_BINDING_TTL, DEFAULT_SWEEP_INTERVAL, MAX_KEY_ATTEMPTS, MemoryRecoveryStore,
    MemoryStoreConfig,
};
pub use types::{RecoveryKey, SignedToken};
