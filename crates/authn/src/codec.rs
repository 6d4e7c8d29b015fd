//! Identity payloads and the signed token codec.
//!
//! A [`SignedToken`] is a compact HS256 JWT whose claims are the
//! [`IdentityPayload`] fields plus an `iat` stamped at signing time:
//!
//! ```json
//! {
//!   "invoice": "3f0c1c8e-6a8b-4b7e-9f59-0b8f3c2d9a11",
//!   "iat": 1700000000
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use twinpath_authn::codec::{IdentityPayload, TokenCodec};
//!
//! let codec = TokenCodec::new(b"process-wide secret");
//! let payload = IdentityPayload::issue();
//!
//! let token = codec.sign(&payload)?;
//! assert_eq!(codec.verify(token.as_str())?, payload);
//! # Ok::<(), twinpath_authn::AuthError>(())
//! ```

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use twinpath_storage::SignedToken;
use uuid::Uuid;

use crate::{error::AuthError, validation::validate_algorithm};

/// Claim carrying the requester's unique identifier.
pub const IDENTIFIER_CLAIM: &str = "invoice";

/// Claims owned by the codec; applications cannot set them.
pub const RESERVED_CLAIMS: &[&str] = &[IDENTIFIER_CLAIM, "iat"];

/// Claims identifying an anonymous requester.
///
/// The identifier is mandatory; any further application claims ride along
/// untouched. Payloads are immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityPayload {
    invoice: String,
    #[serde(flatten)]
    claims: Map<String, Value>,
}

impl IdentityPayload {
    /// Creates a payload for an existing identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { invoice: identifier.into(), claims: Map::new() }
    }

    /// Creates a payload with a freshly generated UUIDv4 identifier.
    #[must_use]
    pub fn issue() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Adds an application claim.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ReservedClaim`] if `name` is in [`RESERVED_CLAIMS`].
    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Result<Self, AuthError> {
        let name = name.into();
        if RESERVED_CLAIMS.contains(&name.as_str()) {
            return Err(AuthError::ReservedClaim(name));
        }
        self.claims.insert(name, value);
        Ok(self)
    }

    /// Returns the requester's unique identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.invoice
    }

    /// Returns an application claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Returns all application claims.
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }
}

#[derive(Serialize)]
struct SigningClaims<'a> {
    #[serde(flatten)]
    payload: &'a IdentityPayload,
    iat: u64,
}

#[derive(Deserialize)]
struct VerifiedClaims {
    #[serde(flatten)]
    payload: IdentityPayload,
    #[allow(dead_code)]
    iat: Option<u64>,
}

/// Decode a token header without verifying the signature.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] if the header cannot be decoded.
pub fn decode_token_header(token: &str) -> Result<Header, AuthError> {
    decode_header(token)
        .map_err(|e| AuthError::malformed(format!("Failed to decode token header: {}", e)))
}

/// Signs payloads into tokens and verifies tokens back into payloads.
///
/// Holds only key material derived from the shared secret; signing and
/// verification never mutate it, so one codec serves all requests.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a codec for the given shared secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Identity tokens carry no expiry or audience; freshness comes from
        // the cookie lifetime and the store TTL.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs `payload` with a fresh issued-at timestamp.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingClaim`] if the identifier is empty
    /// - [`AuthError::Signing`] if the claims cannot be encoded
    pub fn sign(&self, payload: &IdentityPayload) -> Result<SignedToken, AuthError> {
        if payload.invoice.is_empty() {
            return Err(AuthError::missing_claim(IDENTIFIER_CLAIM));
        }
        let claims = SigningClaims { payload, iat: Utc::now().timestamp() as u64 };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map(SignedToken::from)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verifies `token` and returns the payload it carries.
    ///
    /// The algorithm named in the header is checked before the signature, so
    /// a presenter cannot pick the verification algorithm.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Malformed`] if the token is not a structurally valid JWT or lacks the
    ///   identifier claim
    /// - [`AuthError::MissingClaim`] if the identifier claim is empty
    /// - [`AuthError::UnsupportedAlgorithm`] if the header names anything but HS256
    /// - [`AuthError::InvalidSignature`] if the signature does not match
    pub fn verify(&self, token: &str) -> Result<IdentityPayload, AuthError> {
        let header = decode_token_header(token)?;
        validate_algorithm(&format!("{:?}", header.alg))?;

        let data = decode::<VerifiedClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.payload.invoice.is_empty() {
            return Err(AuthError::missing_claim(IDENTIFIER_CLAIM));
        }
        Ok(data.claims.payload)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("algorithm", &Algorithm::HS256).finish_non_exhaustive()
    }
}
