//! Caller identifier resolution from inbound request headers.

use axum::http::HeaderMap;

/// Proxy header carrying a comma-separated client address chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Proxy header carrying a single client address.
pub const REAL_IP: &str = "x-real-ip";
/// Shared identifier for callers that carry no address signal.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Derive the identifier a caller's quota is tracked against.
///
/// Resolution order is the first `x-forwarded-for` entry, then `x-real-ip`,
/// then [`UNKNOWN_IDENTIFIER`]. This never fails. Every caller without an
/// address signal lands in the same bucket.
pub fn resolve_identifier(headers: &HeaderMap) -> String {
    forwarded_for(headers)
        .or_else(|| header_value(headers, REAL_IP))
        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}
