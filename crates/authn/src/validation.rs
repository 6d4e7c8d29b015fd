//! JWT algorithm validation.
//!
//! Identity tokens are signed and verified with a single shared secret, so
//! exactly one algorithm is ever legitimate. Anything else in a presented
//! header is an algorithm substitution attempt and is rejected before the
//! signature is checked.

use crate::error::AuthError;

/// Forbidden JWT algorithms that are never accepted.
///
/// - `none`: No signature verification (trivially bypassable)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none"];

/// Accepted JWT algorithms.
///
/// Tokens are issued with HMAC-SHA256 only. Wider HMAC variants are rejected
/// even though the secret could verify them, so that a token's algorithm is
/// never chosen by its presenter.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["HS256"];

/// Validate JWT algorithm against the accepted list.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use twinpath_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("HS256").is_ok());
/// assert!(validate_algorithm("HS512").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not allowed for security reasons",
            alg
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not in accepted list (only HS256 is supported)",
            alg
        )));
    }

    Ok(())
}
