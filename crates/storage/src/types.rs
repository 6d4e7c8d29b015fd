//! Opaque string types stored and returned by the recovery store.
//!
//! Neither type is ever parsed by the store. [`RecoveryKey`] is a pure index;
//! [`SignedToken`] is whatever the token codec produced.

use uuid::Uuid;

/// Macro to define a newtype wrapper around `String` with the conversions
/// shared by every opaque string in this crate.
///
/// Each generated type:
/// - Derives `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Implements `From<String>`, `From<&str>` and `AsRef<str>`
/// - Exposes `as_str` and `into_inner`
macro_rules! define_opaque {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Returns the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper, returning the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_opaque!(
    /// Server-generated index used to recover a token through the validator
    /// channel.
    ///
    /// Fresh keys are hyphenated UUIDv4 strings (122 random bits), so they are
    /// unguessable and collide with negligible probability. Keys echoed back
    /// by clients are wrapped as-is; an unknown key simply misses.
    ///
    /// # Examples
    ///
    /// ```
    /// use twinpath_storage::RecoveryKey;
    ///
    /// let a = RecoveryKey::generate();
    /// let b = RecoveryKey::generate();
    /// assert_ne!(a, b);
    /// assert_eq!(a.as_str().len(), 36);
    /// ```
    RecoveryKey
);

define_opaque!(
    /// Signed identity token, opaque to the store.
    ///
    /// `Debug` output is redacted: a token is a bearer credential.
    ///
    /// # Examples
    ///
    /// ```
    /// use twinpath_storage::SignedToken;
    ///
    /// let token = SignedToken::from("header.payload.signature");
    /// assert_eq!(token.as_str(), "header.payload.signature");
    /// assert_eq!(format!("{token:?}"), "SignedToken(<redacted>)");
    /// ```
    SignedToken
);

impl RecoveryKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }
}

impl std::fmt::Debug for RecoveryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RecoveryKey").field(&self.0).finish()
    }
}

impl std::fmt::Display for RecoveryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignedToken(<redacted>)")
    }
}
