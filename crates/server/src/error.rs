//! HTTP error mapping.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use twinpath_authn::ReconcileError;
use twinpath_storage::StorageError;

/// Errors surfaced to HTTP clients.
///
/// Every variant renders as a JSON `{"error": ...}` body. Internal failures
/// are logged in full and reported to the client without detail.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No usable bearer token on a protected route.
    #[error("{0}")]
    Unauthorized(String),

    /// The `Accept` header names no representation this route can produce.
    #[error("Not Acceptable")]
    NotAcceptable,

    /// Reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The recovery store failed its health check.
    #[error("recovery store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),
}

impl ApiError {
    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Status code this error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Reconcile(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Unauthorized(message) => {
                let mut response =
                    (status, Json(serde_json::json!({ "error": message }))).into_response();
                response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            },
            ApiError::NotAcceptable => {
                (status, Json(serde_json::json!({ "error": "Not Acceptable" }))).into_response()
            },
            ApiError::Reconcile(err) => {
                error!(error = %err, "identity reconciliation failed");
                (status, Json(serde_json::json!({ "error": "internal error" }))).into_response()
            },
            ApiError::StoreUnavailable(err) => {
                error!(error = %err, "recovery store health check failed");
                (status, Json(serde_json::json!({ "error": "store unavailable" }))).into_response()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotAcceptable.status(), StatusCode::NOT_ACCEPTABLE);
        let store = ReconcileError::Store(StorageError::store_exhausted("full"));
        assert_eq!(ApiError::from(store).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::StoreUnavailable(StorageError::store_exhausted("full")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_unauthorized_challenges_for_bearer() {
        let response = ApiError::unauthorized("no token").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
