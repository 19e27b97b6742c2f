//! Rendering decisions as HTTP responses.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ratelimit::Decision;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// A decision rendered as a response.
///
/// Denials become `429 Too Many Requests`; admissions become `200` with the
/// decision as the JSON body. Both carry the `X-RateLimit-*` headers.
#[derive(Debug, Clone)]
pub struct DecisionResponse(pub Decision);

impl IntoResponse for DecisionResponse {
    fn into_response(self) -> Response {
        let decision = self.0;
        if !decision.allowed {
            return rate_limited_response(&decision);
        }

        let mut response = (StatusCode::OK, Json(&decision)).into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision);
        response
    }
}

/// The `429` response for a denied decision.
///
/// Carries `Retry-After` and a JSON body with the tier's message.
pub fn rate_limited_response(decision: &Decision) -> Response {
    let retry_after = decision.retry_after_secs.unwrap_or(1);
    let body = json!({
        "error": decision.message.as_deref().unwrap_or("Too many requests"),
        "retryAfter": retry_after,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    apply_rate_limit_headers(headers, decision);
    response
}

/// Add `X-RateLimit-Limit`, `-Remaining` and `-Reset` (epoch seconds).
///
/// Status and body are left as they are, so admitted requests can carry
/// the headers on the handler's own response.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_at_secs()));
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_denied_renders_429() {
        let decision = Decision::denied(1, 61_000, 60, "one per minute".to_string());
        let response = rate_limited_response(&decision);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(response.headers()[RATE_LIMIT_LIMIT], "1");
        assert_eq!(response.headers()[RATE_LIMIT_REMAINING], "0");
        assert_eq!(response.headers()[RATE_LIMIT_RESET], "61");

        let body = body_json(response).await;
        assert_eq!(body["error"], "one per minute");
        assert_eq!(body["retryAfter"], 60);
    }

    #[tokio::test]
    async fn test_allowed_renders_ok_with_headers() {
        let response = DecisionResponse(Decision::allowed(100, 42, 5_500)).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        assert_eq!(response.headers()[RATE_LIMIT_REMAINING], "42");
        assert_eq!(response.headers()[RATE_LIMIT_RESET], "6");

        let body = body_json(response).await;
        assert_eq!(body["allowed"], true);
        assert_eq!(body["remaining"], 42);
    }

    #[test]
    fn test_headers_leave_other_headers_alone() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        apply_rate_limit_headers(&mut headers, &Decision::allowed(10, 9, 1_000));

        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[RATE_LIMIT_LIMIT], "10");
        assert_eq!(headers.len(), 4);
    }
}
