//! Storage error types and result alias.
//!
//! Absence of a binding is never an error here: lookups return `Ok(None)`.
//! The variants below are the failures a caller cannot recover from within
//! the current request.
//!
//! # Example
//!
//! ```
//! use twinpath_storage::{StorageError, StorageResult};
//!
//! fn reserve() -> StorageResult<()> {
//!     Err(StorageError::store_exhausted("capacity reached"))
//! }
//! assert!(matches!(reserve(), Err(StorageError::StoreExhausted { .. })));
//! ```

use thiserror::Error;

/// Result type alias for recovery store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during recovery store operations.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No usable recovery key could be produced.
    ///
    /// Raised when every generated key collided with a live binding, or when
    /// the store is at capacity after expired bindings were purged.
    #[error("Recovery store exhausted: {message}")]
    StoreExhausted {
        /// Why no key could be issued.
        message: String,
    },
}

/// Errors raised while validating store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric or duration field is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value, rendered for display.
        min: String,
        /// Value that was supplied, rendered for display.
        value: String,
    },
}

impl StorageError {
    /// Creates a new `StoreExhausted` error with the given message.
    #[must_use]
    pub fn store_exhausted(message: impl Into<String>) -> Self {
        Self::StoreExhausted { message: message.into() }
    }
}
