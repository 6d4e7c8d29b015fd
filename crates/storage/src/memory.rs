//! In-memory recovery store implementation.
//!
//! This module provides [`MemoryRecoveryStore`], the process-local
//! implementation of [`RecoveryStore`].
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Atomic key issuance**: generate, collision check and insert happen under one write lock
//! - **TTL support**: expired bindings read as absent and a background task purges them
//! - **Capacity bound**: optional cap on live bindings
//!
//! # Example
//!
//! ```
//! use twinpath_storage::{MemoryRecoveryStore, RecoveryStore, SignedToken};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryRecoveryStore::new();
//!
//!     let key = store.put(SignedToken::from("a.b.c")).await.unwrap();
//!     assert!(store.get(&key).await.unwrap().is_some());
//! }
//! ```
//!
//! # Limitations
//!
//! - Bindings are not persisted; every key is forgotten when the process exits
//! - The sweep runs on an interval, so memory is reclaimed lazily; reads never see expired
//!   bindings regardless

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use fail::fail_point;
use parking_lot::RwLock;
use tokio::{select, sync::watch, time::sleep};
use tracing::{debug, trace, warn};

use crate::{
    backend::RecoveryStore,
    error::{ConfigError, StorageError, StorageResult},
    types::{RecoveryKey, SignedToken},
};

/// Default lifetime of a binding (24 hours).
pub const DEFAULT_BINDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default interval between expired-binding sweeps (60 seconds).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Number of keys generated before [`put`](RecoveryStore::put) gives up.
pub const MAX_KEY_ATTEMPTS: u32 = 8;

type KeyGenerator = Arc<dyn Fn() -> RecoveryKey + Send + Sync>;

/// Configuration for [`MemoryRecoveryStore`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use twinpath_storage::MemoryStoreConfig;
///
/// let config = MemoryStoreConfig::builder()
///     .binding_ttl(Duration::from_secs(3600))
///     .max_bindings(10_000)
///     .build()?;
/// assert_eq!(config.max_bindings(), Some(10_000));
/// # Ok::<(), twinpath_storage::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    binding_ttl: Duration,
    max_bindings: Option<usize>,
    sweep_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            binding_ttl: DEFAULT_BINDING_TTL,
            max_bindings: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[bon::bon]
impl MemoryStoreConfig {
    /// Creates a new store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `binding_ttl` or `sweep_interval` is zero,
    /// or `max_bindings` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_BINDING_TTL)] binding_ttl: Duration,
        max_bindings: Option<usize>,
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if binding_ttl.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "binding_ttl",
                min: "1ns".into(),
                value: "0s".into(),
            });
        }
        if sweep_interval.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "sweep_interval",
                min: "1ns".into(),
                value: "0s".into(),
            });
        }
        if max_bindings == Some(0) {
            return Err(ConfigError::BelowMinimum {
                field: "max_bindings",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(Self { binding_ttl, max_bindings, sweep_interval })
    }

    /// Returns how long a binding stays live after it is written.
    #[must_use]
    pub fn binding_ttl(&self) -> Duration {
        self.binding_ttl
    }

    /// Returns the maximum number of live bindings, if bounded.
    #[must_use]
    pub fn max_bindings(&self) -> Option<usize> {
        self.max_bindings
    }

    /// Returns the interval between background sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

#[derive(Clone)]
struct Binding {
    token: SignedToken,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Binding {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

type Bindings = Arc<RwLock<HashMap<RecoveryKey, Binding>>>;

/// Holds the shutdown signal sender. When dropped, the watch channel
/// closes and the sweep task exits.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Best effort; the sweep task may never have been spawned.
        let _ = self.shutdown_tx.send(());
    }
}

/// In-memory recovery store backed by a [`HashMap`].
///
/// # Cloning
///
/// `MemoryRecoveryStore` is cheaply cloneable via [`Arc`]. All clones share
/// the same bindings.
///
/// # Shutdown
///
/// When constructed inside a tokio runtime, a background task purges expired
/// bindings every [`sweep_interval`](MemoryStoreConfig::sweep_interval). The
/// task stops when the last clone is dropped, or explicitly via
/// [`shutdown`](Self::shutdown). Outside a runtime no task is spawned and
/// expired bindings are only purged when capacity pressure forces it.
#[derive(Clone)]
pub struct MemoryRecoveryStore {
    bindings: Bindings,
    config: MemoryStoreConfig,
    key_generator: KeyGenerator,
    shutdown_guard: Arc<ShutdownGuard>,
}

impl MemoryRecoveryStore {
    /// Creates a store with [`MemoryStoreConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates a store with the given configuration.
    #[must_use]
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let bindings: Bindings = Arc::new(RwLock::new(HashMap::new()));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let swept = Arc::clone(&bindings);
                let interval = config.sweep_interval;
                handle.spawn(async move {
                    sweep_expired_bindings(swept, interval, shutdown_rx).await;
                });
            },
            Err(_) => debug!("no tokio runtime; expired bindings are purged lazily"),
        }

        Self {
            bindings,
            config,
            key_generator: Arc::new(RecoveryKey::generate),
            shutdown_guard: Arc::new(ShutdownGuard { shutdown_tx }),
        }
    }

    /// Replaces the key generator.
    ///
    /// Keys must stay unguessable in production; this exists so tests can
    /// force collisions deterministically.
    #[must_use]
    pub fn with_key_generator(
        mut self,
        generator: impl Fn() -> RecoveryKey + Send + Sync + 'static,
    ) -> Self {
        self.key_generator = Arc::new(generator);
        self
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Explicitly signals the background sweep task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_guard.shutdown_tx.send(());
    }

    /// Removes every expired binding, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        purge(&self.bindings, Instant::now())
    }
}

impl Default for MemoryRecoveryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn purge(bindings: &Bindings, now: Instant) -> usize {
    let mut guard = bindings.write();
    let before = guard.len();
    guard.retain(|_, binding| binding.is_live(now));
    before - guard.len()
}

/// Background task removing expired bindings.
///
/// Exits when the shutdown signal is received or the sender is dropped.
async fn sweep_expired_bindings(
    bindings: Bindings,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    loop {
        select! {
            _ = sleep(interval) => {}
            _ = shutdown_rx.changed() => {
                return;
            }
        }

        let removed = purge(&bindings, Instant::now());
        if removed > 0 {
            trace!(removed, "swept expired recovery bindings");
        }
    }
}

#[async_trait]
impl RecoveryStore for MemoryRecoveryStore {
    #[tracing::instrument(skip(self, token))]
    async fn put(&self, token: SignedToken) -> StorageResult<RecoveryKey> {
        fail_point!("recovery-store-before-put", |_| {
            Err(StorageError::store_exhausted("injected failure"))
        });

        let now = Instant::now();
        let expires_at = now.checked_add(self.config.binding_ttl);
        let mut bindings = self.bindings.write();

        if let Some(max) = self.config.max_bindings
            && bindings.len() >= max
        {
            bindings.retain(|_, binding| binding.is_live(now));
            if bindings.len() >= max {
                warn!(max_bindings = max, "recovery store at capacity");
                return Err(StorageError::store_exhausted(format!(
                    "capacity of {max} bindings reached"
                )));
            }
        }

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = (self.key_generator)();
            let occupied = bindings.get(&key).is_some_and(|binding| binding.is_live(now));
            if occupied {
                warn!(attempt, "recovery key collision");
                continue;
            }

            bindings.insert(key.clone(), Binding { token, expires_at });
            debug!(key = %key, "bound recovery key");
            return Ok(key);
        }

        Err(StorageError::store_exhausted(format!(
            "no unused key after {MAX_KEY_ATTEMPTS} attempts"
        )))
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &RecoveryKey) -> StorageResult<Option<SignedToken>> {
        let now = Instant::now();
        let bindings = self.bindings.read();
        Ok(bindings.get(key).filter(|binding| binding.is_live(now)).map(|b| b.token.clone()))
    }

    #[tracing::instrument(skip(self, token), fields(key = %key))]
    async fn replace(&self, key: &RecoveryKey, token: SignedToken) -> StorageResult<bool> {
        let now = Instant::now();
        let mut bindings = self.bindings.write();

        match bindings.get_mut(key) {
            Some(binding) if binding.is_live(now) => {
                binding.token = token;
                binding.expires_at = now.checked_add(self.config.binding_ttl);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn len(&self) -> StorageResult<usize> {
        let now = Instant::now();
        let bindings = self.bindings.read();
        Ok(bindings.values().filter(|binding| binding.is_live(now)).count())
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<()> {
        // Acquiring the read lock proves we are not deadlocked.
        let _unused = self.bindings.read();
        Ok(())
    }
}
