//! Shared test utilities for identity token testing.
//!
//! This module provides helpers for building engines over a fresh store,
//! signing tokens with arbitrary secrets or algorithms, and crafting or
//! tampering with raw token strings (for attack testing). It is
//! feature-gated behind `testutil` to prevent leaking into production
//! builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! twinpath-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use twinpath_authn::testutil::{test_engine, tamper_signature};
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use twinpath_storage::MemoryRecoveryStore;

use crate::{config::IdentityConfig, reconcile::ReconciliationEngine};

/// Secret used by [`test_config`].
pub const TEST_SECRET: &str = "twinpath-test-secret";

/// Creates an [`IdentityConfig`] signing with [`TEST_SECRET`].
///
/// # Panics
///
/// Panics if the default configuration fails validation.
#[must_use]
pub fn test_config() -> IdentityConfig {
    IdentityConfig::builder().secret(TEST_SECRET).build().expect("test config must be valid")
}

/// Creates an engine over a fresh [`MemoryRecoveryStore`].
///
/// Returns the store as well so tests can inspect bindings directly.
#[must_use]
pub fn test_engine() -> (ReconciliationEngine, Arc<MemoryRecoveryStore>) {
    let store = Arc::new(MemoryRecoveryStore::new());
    let engine = ReconciliationEngine::new(&test_config(), store.clone())
        .expect("test config must be valid");
    (engine, store)
}

/// Signs `{"invoice": identifier, "iat": now}` with an HMAC `secret`.
///
/// # Panics
///
/// Panics if encoding fails (should not happen with valid inputs).
pub fn sign_with_secret(secret: &[u8], identifier: &str) -> String {
    sign_with_algorithm(Algorithm::HS256, secret, identifier)
}

/// Signs an identity token with an arbitrary HMAC algorithm.
///
/// Used to check that tokens signed with the right secret but the wrong
/// algorithm are still rejected.
///
/// # Panics
///
/// Panics if encoding fails.
pub fn sign_with_algorithm(algorithm: Algorithm, secret: &[u8], identifier: &str) -> String {
    let claims = json!({ "invoice": identifier, "iat": Utc::now().timestamp() });
    jsonwebtoken::encode(&Header::new(algorithm), &claims, &EncodingKey::from_secret(secret))
        .expect("Failed to encode test token")
}

/// Creates a raw token string from arbitrary header and payload JSON.
///
/// The resulting token has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature. This is useful for testing rejection of
/// malformed or attack tokens (e.g., `alg: "none"`).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Replaces the payload segment of `token`, keeping header and signature.
///
/// # Panics
///
/// Panics if `token` does not have three segments.
pub fn tamper_payload(token: &str, payload_json: &Value) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token must have three segments");
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{}.{payload_b64}.{}", parts[0], parts[2])
}

/// Flips the first character of the signature segment of `token`.
///
/// # Panics
///
/// Panics if `token` has no signature segment.
pub fn tamper_signature(token: &str) -> String {
    let (head, signature) = token.rsplit_once('.').expect("token must have a signature");
    let mut chars = signature.chars();
    let first = chars.next().expect("signature must not be empty");
    let flipped = if first == 'A' { 'B' } else { 'A' };
    format!("{head}.{flipped}{}", chars.as_str())
}

/// Asserts that a [`Result<T, AuthError>`](crate::error::AuthError) is an
/// `Err` matching the given variant.
///
/// On failure, prints the expected variant and the actual result for
/// debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use twinpath_authn::assert_auth_error;
/// use twinpath_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::InvalidSignature);
/// assert_auth_error!(result, InvalidSignature);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
