//! Authentication error types.
//!
//! This module defines errors that can occur while signing or verifying
//! identity tokens and while validating identity configuration.

use thiserror::Error;

/// Token and configuration errors.
///
/// During reconciliation every verification variant is recovered locally and
/// falls through to the next channel; none of them reaches the client.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Input is not a structurally valid token.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the configured secret, or the payload was
    /// altered after signing.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Header names an algorithm other than the one tokens are issued with.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Required claim is missing.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// Application claim collides with a claim managed by the codec.
    #[error("Reserved claim: {0}")]
    ReservedClaim(String),

    /// Token could not be produced.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Identity configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Creates a new `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim(claim.into())
    }

    /// Creates a new `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns `true` for errors produced while verifying a presented token.
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::InvalidSignature
                | Self::UnsupportedAlgorithm(_)
                | Self::MissingClaim(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => AuthError::malformed("Invalid JWT structure"),
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => {
                AuthError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            ErrorKind::MissingRequiredClaim(claim) => AuthError::missing_claim(claim.clone()),
            ErrorKind::Base64(e) => AuthError::malformed(format!("Invalid base64: {e}")),
            ErrorKind::Json(e) => AuthError::malformed(format!("Invalid JSON: {e}")),
            ErrorKind::Utf8(e) => AuthError::malformed(format!("Invalid UTF-8: {e}")),
            _ => AuthError::malformed(format!("JWT error: {err}")),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
