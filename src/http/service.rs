//! Admission service routes.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::response::DecisionResponse;
use crate::error::TollgateError;
use crate::ratelimit::{resolve_identifier, RateLimiter};

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
}

/// Build the admission service router.
///
/// - `GET /v1/check/:tier` counts one request for the caller identified by
///   the proxy headers and answers `200` or `429`.
/// - `GET /health` reports which counter store is active.
pub fn router(limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/v1/check/:tier", get(check))
        .route("/health", get(health))
        .with_state(AppState { limiter })
}

#[instrument(skip(state, headers), fields(identifier = tracing::field::Empty))]
async fn check(
    State(state): State<AppState>,
    Path(tier): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identifier = resolve_identifier(&headers);
    tracing::Span::current().record("identifier", identifier.as_str());

    match state.limiter.evaluate_named(&identifier, &tier).await {
        Ok(decision) => {
            debug!(
                allowed = decision.allowed,
                remaining = decision.remaining,
                "Admission decision made"
            );
            DecisionResponse(decision).into_response()
        }
        Err(TollgateError::UnknownTier(name)) => {
            warn!(tier = %name, "Admission check for unknown tier");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown rate limit tier: {}", name) })),
            )
                .into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "store": state.limiter.store_kind(),
    }))
}
