//! Dual-channel identity reconciliation.
//!
//! For every request the engine decides which identity the requester has,
//! consulting the cookie channel first, then the validator channel, and
//! issuing a fresh identity only when both come up empty:
//!
//! ```text
//!   cookie ──verify──► payload ───────────────────────────┐
//!     │ absent/invalid                                    │
//!     ▼                                                   ▼
//!   validator ──store.get──► token ──verify──► payload ──► sign ──► put / replace
//!     │ absent/unbound/invalid                            ▲
//!     ▼                                                   │
//!   IdentityPayload::issue() ─────────────────────────────┘
//! ```
//!
//! Verification failures never escape: a rejected cookie and a first visit
//! look the same to the client. Only store failures while binding the new
//! token are fatal.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use twinpath_storage::{RecoveryKey, RecoveryStore, SignedToken, StorageError};

use crate::{
    codec::{IdentityPayload, TokenCodec},
    config::IdentityConfig,
    error::AuthError,
};

/// Recovery signals extracted from one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoverySignals {
    /// Raw value of the identity cookie, if sent.
    pub cookie: Option<String>,
    /// Validator key echoed back by the client, if sent.
    pub validator: Option<String>,
}

impl RecoverySignals {
    /// Creates signals from the two optional channel values.
    #[must_use]
    pub fn new(cookie: Option<String>, validator: Option<String>) -> Self {
        Self { cookie, validator }
    }
}

/// Which step produced the resolved payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The cookie token verified.
    Cookie,
    /// The validator key was bound to a token that verified.
    Validator,
    /// Neither channel resolved; a new identity was issued.
    Issued,
}

/// Outcome of reconciling one request.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// The requester's identity.
    pub payload: IdentityPayload,
    /// Freshly signed token to set as the cookie value.
    pub token: SignedToken,
    /// Validator key to emit.
    pub validator_key: RecoveryKey,
    /// `true` when `validator_key` is the key the client presented.
    pub reused_validator_key: bool,
    /// Which step resolved the payload.
    pub source: ResolutionSource,
}

/// Fatal reconciliation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// The store could not bind the new token.
    #[error("Recovery store error: {0}")]
    Store(#[from] StorageError),

    /// The resolved payload could not be signed.
    #[error("Token signing failed: {0}")]
    Signing(#[source] AuthError),
}

/// Resolves requester identities from cookie and validator signals.
///
/// Both the signing secret and the store are injected, so independent
/// engines can coexist in one process.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use twinpath_authn::{IdentityConfig, ReconciliationEngine, RecoverySignals, ResolutionSource};
/// use twinpath_storage::MemoryRecoveryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let config = IdentityConfig::builder().secret("s3cret").build().unwrap();
/// let engine = ReconciliationEngine::new(&config, Arc::new(MemoryRecoveryStore::new())).unwrap();
///
/// let first = engine.resolve(RecoverySignals::default()).await.unwrap();
/// assert_eq!(first.source, ResolutionSource::Issued);
///
/// // A client that lost its cookie but kept the validator gets the same identity.
/// let signals = RecoverySignals::new(None, Some(first.validator_key.to_string()));
/// let second = engine.resolve(signals).await.unwrap();
/// assert_eq!(second.payload, first.payload);
/// assert_eq!(second.validator_key, first.validator_key);
/// # });
/// ```
pub struct ReconciliationEngine {
    codec: TokenCodec,
    store: Arc<dyn RecoveryStore>,
    refresh_reused_binding: bool,
}

impl ReconciliationEngine {
    /// Creates an engine over `store`.
    ///
    /// `config` is validated again here; deserialized configurations skip
    /// the builder.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `config` fails
    /// [`IdentityConfig::validate`].
    pub fn new(
        config: &IdentityConfig,
        store: Arc<dyn RecoveryStore>,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            codec: TokenCodec::new(config.secret()),
            store,
            refresh_reused_binding: config.refresh_reused_binding(),
        })
    }

    /// Returns the codec, for consumers that verify bearer tokens.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecoveryStore> {
        &self.store
    }

    /// Resolves the requester's identity and the effects that keep it
    /// recoverable.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if a fresh validator key cannot be
    /// bound, and [`ReconcileError::Signing`] if the payload cannot be signed.
    #[tracing::instrument(
        skip_all,
        fields(has_cookie = signals.cookie.is_some(), has_validator = signals.validator.is_some())
    )]
    pub async fn resolve(&self, signals: RecoverySignals) -> Result<Resolution, ReconcileError> {
        let (payload, reusable_key, source) =
            if let Some(payload) = self.from_cookie(signals.cookie.as_deref()) {
                (payload, None, ResolutionSource::Cookie)
            } else if let Some((payload, key)) = self.from_validator(signals.validator).await {
                (payload, Some(key), ResolutionSource::Validator)
            } else {
                debug!("no recoverable identity, issuing a new one");
                (IdentityPayload::issue(), None, ResolutionSource::Issued)
            };

        let token = self.codec.sign(&payload).map_err(ReconcileError::Signing)?;

        let (validator_key, reused_validator_key) = match reusable_key {
            Some(key) if self.rebind(&key, &token).await => (key, true),
            _ => (self.store.put(token.clone()).await?, false),
        };

        debug!(
            source = ?source,
            validator_key = %validator_key,
            reused = reused_validator_key,
            "identity resolved"
        );

        Ok(Resolution { payload, token, validator_key, reused_validator_key, source })
    }

    fn from_cookie(&self, cookie: Option<&str>) -> Option<IdentityPayload> {
        let cookie = cookie.filter(|value| !value.is_empty())?;
        match self.codec.verify(cookie) {
            Ok(payload) => {
                debug!(identifier = payload.identifier(), "token verified from cookie");
                Some(payload)
            },
            Err(e) => {
                debug!(error = %e, "unable to verify cookie token");
                None
            },
        }
    }

    async fn from_validator(
        &self,
        validator: Option<String>,
    ) -> Option<(IdentityPayload, RecoveryKey)> {
        let key = RecoveryKey::from(validator.filter(|value| !value.is_empty())?);

        let token = match self.store.get(&key).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(validator_key = %key, "validator key not in store");
                return None;
            },
            Err(e) => {
                warn!(validator_key = %key, error = %e, "validator lookup failed");
                return None;
            },
        };

        match self.codec.verify(token.as_str()) {
            Ok(payload) => {
                debug!(
                    validator_key = %key,
                    identifier = payload.identifier(),
                    "token verified from validator"
                );
                Some((payload, key))
            },
            Err(e) => {
                debug!(validator_key = %key, error = %e, "unable to verify bound token");
                None
            },
        }
    }

    /// Decides whether `key` can be re-emitted for `token`.
    ///
    /// Without refresh the key is always reused and its binding left as is.
    /// With refresh, a binding that vanished since it was read (or a store
    /// error) means a new key must be issued instead.
    async fn rebind(&self, key: &RecoveryKey, token: &SignedToken) -> bool {
        if !self.refresh_reused_binding {
            return true;
        }
        match self.store.replace(key, token.clone()).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(validator_key = %key, "binding expired before refresh");
                false
            },
            Err(e) => {
                warn!(validator_key = %key, error = %e, "binding refresh failed");
                false
            },
        }
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("codec", &self.codec)
            .field("refresh_reused_binding", &self.refresh_reused_binding)
            .finish_non_exhaustive()
    }
}
