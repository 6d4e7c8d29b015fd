//! Recovery store trait definition.
//!
//! [`RecoveryStore`] is the persistence primitive behind the validator
//! channel: it maps server-generated [`RecoveryKey`]s to the last
//! [`SignedToken`] issued for that key. It performs no verification and no
//! parsing of what it stores.
//!
//! # Contract
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`put`](RecoveryStore::put) | Bind a token to a freshly generated key |
//! | [`get`](RecoveryStore::get) | Look up the token for a key; absent is `Ok(None)` |
//! | [`replace`](RecoveryStore::replace) | Overwrite an existing live binding |
//! | [`len`](RecoveryStore::len) | Count live bindings |
//! | [`health_check`](RecoveryStore::health_check) | Verify the store is usable |
//!
//! See [`MemoryRecoveryStore`](crate::MemoryRecoveryStore) for the in-process
//! implementation.

use async_trait::async_trait;

use crate::{
    error::StorageResult,
    types::{RecoveryKey, SignedToken},
};

/// Mapping from recovery keys to signed tokens.
///
/// Implementations must be safe under concurrent use: two concurrent
/// [`put`](RecoveryStore::put) calls never return the same key, and a
/// [`get`](RecoveryStore::get) concurrent with a write to a different key
/// never observes partial state.
///
/// # Example
///
/// ```
/// use twinpath_storage::{MemoryRecoveryStore, RecoveryStore, SignedToken};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryRecoveryStore::new();
///
/// let key = store.put(SignedToken::from("a.b.c")).await.unwrap();
/// let token = store.get(&key).await.unwrap();
/// assert_eq!(token, Some(SignedToken::from("a.b.c")));
/// # });
/// ```
#[async_trait]
pub trait RecoveryStore: Send + Sync {
    /// Generates a fresh unique key, binds it to `token`, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreExhausted`](crate::StorageError::StoreExhausted) when no
    /// unused key can be produced.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn put(&self, token: SignedToken) -> StorageResult<RecoveryKey>;

    /// Returns the token bound to `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))` if a live binding exists
    /// - `Ok(None)` if the key was never issued, has expired, or belongs to a previous process
    ///   lifetime
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &RecoveryKey) -> StorageResult<Option<SignedToken>>;

    /// Overwrites the binding for an existing key.
    ///
    /// Returns `Ok(false)` and writes nothing when `key` has no live binding;
    /// a key the store did not generate is never created here. A successful
    /// replace restarts the binding's time-to-live.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn replace(&self, key: &RecoveryKey, token: SignedToken) -> StorageResult<bool>;

    /// Returns the number of live bindings.
    async fn len(&self) -> StorageResult<usize>;

    /// Returns `true` when there are no live bindings.
    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Verifies the store is able to serve requests.
    async fn health_check(&self) -> StorageResult<()>;
}
