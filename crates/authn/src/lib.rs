//! # Twinpath Authentication
//!
//! Signed identity tokens and the dual-channel reconciliation engine that
//! keeps an anonymous requester's identity stable across cookie loss.
//!
//! This crate provides:
//! - **Token codec**: HS256 signing and verification of identity payloads
//! - **Algorithm validation**: Header checks that reject algorithm substitution
//! - **Reconciliation**: Cookie first, validator second, fresh identity last
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use twinpath_authn::{IdentityConfig, ReconciliationEngine, RecoverySignals};
//! use twinpath_storage::MemoryRecoveryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IdentityConfig::builder().secret("process-wide secret").build()?;
//! let engine = ReconciliationEngine::new(&config, Arc::new(MemoryRecoveryStore::new()))?;
//!
//! // Signals come from the request: the cookie value and the echoed validator.
//! let signals = RecoverySignals::new(None, Some("3b9d...".to_owned()));
//! let resolution = engine.resolve(signals).await?;
//!
//! println!("identity {} via {:?}", resolution.payload.identifier(), resolution.source);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Identity payloads and the token codec.
pub mod codec;
/// Identity configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Dual-channel reconciliation.
pub mod reconcile;
/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
/// Algorithm validation.
pub mod validation;

// Re-export key types for convenience
pub use codec::{IDENTIFIER_CLAIM, IdentityPayload, RESERVED_CLAIMS, TokenCodec};
pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_TTL, IdentityConfig};
pub use error::{AuthError, Result};
pub use reconcile::{
    ReconcileError, ReconciliationEngine, RecoverySignals, Resolution, ResolutionSource,
};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
