//! Admission decisions returned to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The outcome of a single admission check.
///
/// Decisions are built fresh for each request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u64,
    /// The tier's quota per window
    pub limit: u64,
    /// When the current window ends, in epoch milliseconds
    pub reset_at_ms: u64,
    /// Seconds a denied caller should wait before retrying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// Human-readable denial message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Decision {
    /// An admitted request.
    pub fn allowed(limit: u64, remaining: u64, reset_at_ms: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            limit,
            reset_at_ms,
            retry_after_secs: None,
            message: None,
        }
    }

    /// A rejected request. Remaining quota is always zero.
    pub fn denied(limit: u64, reset_at_ms: u64, retry_after_secs: u64, message: String) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit,
            reset_at_ms,
            retry_after_secs: Some(retry_after_secs),
            message: Some(message),
        }
    }

    /// The window reset time as a UTC timestamp.
    pub fn reset_at(&self) -> DateTime<Utc> {
        i64::try_from(self.reset_at_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The window reset time in whole epoch seconds, rounded up.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }
}

/// Whole seconds until `reset_at_ms`, rounded up and never below one.
pub(crate) fn retry_after_secs(reset_at_ms: u64, now_ms: u64) -> u64 {
    reset_at_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(10_000, 9_000), 1);
        assert_eq!(retry_after_secs(10_000, 8_999), 2);
        assert_eq!(retry_after_secs(70_000, 10_000), 60);
    }

    #[test]
    fn test_retry_after_floor_is_one_second() {
        assert_eq!(retry_after_secs(10_000, 10_000), 1);
        assert_eq!(retry_after_secs(10_000, 12_000), 1);
    }

    #[test]
    fn test_denied_has_no_remaining() {
        let decision = Decision::denied(5, 2_000, 2, "slow down".to_string());
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after_secs, Some(2));
    }

    #[test]
    fn test_serializes_camel_case() {
        let decision = Decision::allowed(10, 9, 1_700_000_000_500);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["resetAtMs"], 1_700_000_000_500u64);
        assert!(json.get("retryAfterSecs").is_none());
        assert_eq!(decision.reset_at().timestamp(), 1_700_000_000);
        assert_eq!(decision.reset_at_secs(), 1_700_000_001);
    }
}
