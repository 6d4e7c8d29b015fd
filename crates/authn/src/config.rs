//! Identity configuration.
//!
//! [`IdentityConfig`] carries everything the reconciliation engine and the
//! boundary handler need to agree on: the signing secret, the cookie that
//! carries tokens, and whether reused validator keys get their binding
//! refreshed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Default cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "twinpath-id";

/// Default cookie lifetime (30 days).
pub const DEFAULT_COOKIE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Characters RFC 6265 forbids in a cookie name besides controls and spaces.
const COOKIE_NAME_SEPARATORS: &str = "()<>@,;:\\\"/[]?={}";

/// Configuration for [`ReconciliationEngine`](crate::ReconciliationEngine)
/// and the cookie it feeds.
///
/// The secret is accepted on deserialization but never serialized, and is
/// redacted from `Debug` output.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use twinpath_authn::IdentityConfig;
///
/// let config = IdentityConfig::builder()
///     .secret("correct horse battery staple")
///     .cookie_ttl(Duration::from_secs(3600))
///     .build()?;
/// assert_eq!(config.cookie_name(), "twinpath-id");
/// # Ok::<(), twinpath_authn::AuthError>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Shared HMAC secret.
    #[serde(skip_serializing)]
    pub(crate) secret: Zeroizing<String>,

    /// Name of the cookie carrying the signed token.
    #[serde(default = "default_cookie_name")]
    pub(crate) cookie_name: String,

    /// Lifetime of the identity cookie.
    #[serde(with = "humantime_serde", default = "default_cookie_ttl")]
    pub(crate) cookie_ttl: Duration,

    /// Rewrite a reused validator key's binding with the freshly signed token.
    #[serde(default = "default_refresh_reused_binding")]
    pub(crate) refresh_reused_binding: bool,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_owned()
}

fn default_cookie_ttl() -> Duration {
    DEFAULT_COOKIE_TTL
}

fn default_refresh_reused_binding() -> bool {
    true
}

#[bon::bon]
impl IdentityConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `cookie_name` - Cookie name (default: `twinpath-id`).
    /// * `cookie_ttl` - Cookie lifetime (default: 30 days).
    /// * `refresh_reused_binding` - Refresh store bindings on validator reuse (default: true).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if the secret is empty, the cookie
    /// name is not a valid RFC 6265 token, or the cookie lifetime is zero.
    #[builder]
    pub fn new(
        #[builder(into)] secret: String,
        #[builder(into, default = DEFAULT_COOKIE_NAME.to_owned())] cookie_name: String,
        #[builder(default = DEFAULT_COOKIE_TTL)] cookie_ttl: Duration,
        #[builder(default = true)] refresh_reused_binding: bool,
    ) -> Result<Self> {
        let config = Self {
            secret: Zeroizing::new(secret),
            cookie_name,
            cookie_ttl,
            refresh_reused_binding,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that deserialization cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.secret.is_empty() {
            return Err(AuthError::invalid_config("secret must not be empty"));
        }
        if self.cookie_name.is_empty() {
            return Err(AuthError::invalid_config("cookie_name must not be empty"));
        }
        if let Some(bad) = self
            .cookie_name
            .chars()
            .find(|c| !c.is_ascii_graphic() || COOKIE_NAME_SEPARATORS.contains(*c))
        {
            return Err(AuthError::invalid_config(format!(
                "cookie_name contains invalid character {bad:?}"
            )));
        }
        if self.cookie_ttl.is_zero() {
            return Err(AuthError::invalid_config("cookie_ttl must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the signing secret.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Returns the cookie name.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Returns the cookie lifetime.
    #[must_use]
    pub fn cookie_ttl(&self) -> Duration {
        self.cookie_ttl
    }

    /// Returns whether reused validator bindings are refreshed.
    #[must_use]
    pub fn refresh_reused_binding(&self) -> bool {
        self.refresh_reused_binding
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("secret", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_ttl", &self.cookie_ttl)
            .field("refresh_reused_binding", &self.refresh_reused_binding)
            .finish()
    }
}
