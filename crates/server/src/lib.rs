//! # Twinpath Server
//!
//! HTTP boundary for dual-channel anonymous identity.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /token` | Reconcile cookie and `If-None-Match`, re-issue both channels |
//! | `GET /api-view` | Bearer-protected; returns the verified identity payload |
//! | `GET /health` | Recovery store health |
//!
//! Every `/token` response refreshes the cookie and the `ETag`, so a client
//! that loses one channel can recover its identity through the other on the
//! next request.

#![deny(unsafe_code)]

pub mod error;
pub mod headers;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{
        HeaderMap,
        header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, ETAG, SET_COOKIE},
    },
    response::{AppendHeaders, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use twinpath_authn::{
    AuthError, IdentityConfig, IdentityPayload, ReconciliationEngine, RecoverySignals,
};
use twinpath_storage::RecoveryStore;

pub use crate::error::ApiError;
use crate::headers::{
    APPLICATION_JWT, Representation, bearer_token, cookie_value, entity_tag, identity_cookie,
    negotiate, validator_tag,
};

/// Caches must revalidate so the `ETag` is echoed back on every request.
const TOKEN_CACHE_CONTROL: &str = "private, no-cache";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<ReconciliationEngine>,
    cookie_name: Arc<str>,
    cookie_ttl: Duration,
}

impl AppState {
    /// Creates handler state over `store`, signing with `config`'s secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: &IdentityConfig, store: Arc<dyn RecoveryStore>) -> Result<Self, AuthError> {
        Ok(Self {
            engine: Arc::new(ReconciliationEngine::new(config, store)?),
            cookie_name: Arc::from(config.cookie_name()),
            cookie_ttl: config.cookie_ttl(),
        })
    }

    /// Returns the reconciliation engine.
    #[must_use]
    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }
}

/// Builds the router for all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/token", get(token))
        .route("/api-view", get(api_view))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
struct TokenBody<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    bindings: usize,
}

#[tracing::instrument(skip_all)]
async fn token(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let signals =
        RecoverySignals::new(cookie_value(&headers, &state.cookie_name), validator_tag(&headers));
    let resolution = state.engine.resolve(signals).await?;

    let identity_headers = AppendHeaders([
        (
            SET_COOKIE,
            identity_cookie(
                &state.cookie_name,
                resolution.token.as_str(),
                state.cookie_ttl,
                Utc::now(),
            ),
        ),
        (ETAG, entity_tag(resolution.validator_key.as_str())),
        (CACHE_CONTROL, TOKEN_CACHE_CONTROL.to_owned()),
    ]);

    // The channels are refreshed even when no body can be produced.
    let response = match negotiate(headers.get(ACCEPT)) {
        Some(Representation::Json) => {
            (identity_headers, Json(TokenBody { token: resolution.token.as_str() })).into_response()
        },
        Some(Representation::Jwt) => (
            identity_headers,
            [(CONTENT_TYPE, APPLICATION_JWT)],
            resolution.token.into_inner(),
        )
            .into_response(),
        None => {
            debug!(accept = ?headers.get(ACCEPT), "no acceptable token representation");
            (identity_headers, ApiError::NotAcceptable).into_response()
        },
    };
    Ok(response)
}

#[tracing::instrument(skip_all)]
async fn api_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Result<Json<IdentityPayload>, ApiError> {
    let token = bearer_token(&headers)
        .map(str::to_owned)
        .or(query.token)
        .ok_or_else(|| ApiError::unauthorized("No authorization token was found"))?;

    let payload = state.engine.codec().verify(&token).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        ApiError::unauthorized("invalid token")
    })?;
    Ok(Json(payload))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.engine.store();
    store.health_check().await.map_err(ApiError::StoreUnavailable)?;
    let bindings = store.len().await.map_err(ApiError::StoreUnavailable)?;
    Ok(Json(HealthResponse { status: "ok", service: "twinpath-server", bindings }))
}
