//! The rate limit policy catalogue.
//!
//! Every class of operation in the marketplace maps to exactly one [`Tier`],
//! and every tier to exactly one [`RateLimitConfig`]. The catalogue is built
//! once at startup and is read-only afterwards; tiers are never added or
//! removed at runtime.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TollgateError};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Quota and window for a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_requests: u64,
    window: Duration,
    message: Option<String>,
}

impl RateLimitConfig {
    /// Create a config, rejecting a zero quota or a sub-millisecond window.
    pub fn new(max_requests: u64, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(TollgateError::InvalidPolicy(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if window.as_millis() == 0 {
            return Err(TollgateError::InvalidPolicy(format!(
                "window must be at least one millisecond, got {:?}",
                window
            )));
        }
        Ok(Self {
            max_requests,
            window,
            message: None,
        })
    }

    /// Attach the message shown to denied callers.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The denial message, falling back to one that embeds the retry time.
    pub fn denial_message(&self, retry_after_secs: u64) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!(
                "Too many requests. Please try again in {} seconds.",
                retry_after_secs
            ),
        }
    }
}

/// What to do with a request when the shared counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Admit the request and log the outage
    Open,
    /// Reject the request with a retry hint
    Closed,
}

/// The operation classes that carry their own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    Auth,
    PasswordReset,
    Api,
    Sensitive,
    Booking,
    Messaging,
    Feedback,
    Admin,
    Payment,
    Financial,
    Dispute,
    Upload,
    Cron,
}

impl Tier {
    pub const ALL: [Tier; 13] = [
        Tier::Auth,
        Tier::PasswordReset,
        Tier::Api,
        Tier::Sensitive,
        Tier::Booking,
        Tier::Messaging,
        Tier::Feedback,
        Tier::Admin,
        Tier::Payment,
        Tier::Financial,
        Tier::Dispute,
        Tier::Upload,
        Tier::Cron,
    ];

    /// Canonical tier name as used in keys, URLs and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Auth => "auth",
            Tier::PasswordReset => "passwordReset",
            Tier::Api => "api",
            Tier::Sensitive => "sensitive",
            Tier::Booking => "booking",
            Tier::Messaging => "messaging",
            Tier::Feedback => "feedback",
            Tier::Admin => "admin",
            Tier::Payment => "payment",
            Tier::Financial => "financial",
            Tier::Dispute => "dispute",
            Tier::Upload => "upload",
            Tier::Cron => "cron",
        }
    }

    /// Behaviour when the distributed store is unavailable.
    ///
    /// Money-moving and account-sensitive operations fail closed; everything
    /// else fails open.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Tier::Financial | Tier::Sensitive => FailurePolicy::Closed,
            _ => FailurePolicy::Open,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = TollgateError;

    fn from_str(s: &str) -> Result<Self> {
        Tier::ALL
            .iter()
            .copied()
            .find(|tier| tier.name() == s)
            .ok_or_else(|| TollgateError::UnknownTier(s.to_string()))
    }
}

/// Read-only lookup from tier to its policy.
#[derive(Debug, Clone)]
pub struct PolicyCatalogue {
    policies: HashMap<Tier, RateLimitConfig>,
}

impl PolicyCatalogue {
    /// The marketplace's production tiers.
    pub fn standard() -> Self {
        let policies = Tier::ALL
            .iter()
            .map(|&tier| (tier, standard_policy(tier)))
            .collect();
        Self { policies }
    }

    /// The policy for a tier. Every tier is present by construction.
    pub fn get(&self, tier: Tier) -> &RateLimitConfig {
        &self.policies[&tier]
    }

    /// Resolve a tier by name, failing fast on names outside the catalogue.
    pub fn lookup(&self, name: &str) -> Result<(Tier, &RateLimitConfig)> {
        let tier: Tier = name.parse()?;
        Ok((tier, self.get(tier)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &RateLimitConfig)> {
        Tier::ALL.iter().map(move |&tier| (tier, self.get(tier)))
    }
}

impl Default for PolicyCatalogue {
    fn default() -> Self {
        Self::standard()
    }
}

fn policy(max_requests: u64, window: Duration, message: &str) -> RateLimitConfig {
    RateLimitConfig {
        max_requests,
        window,
        message: Some(message.to_string()),
    }
}

fn standard_policy(tier: Tier) -> RateLimitConfig {
    match tier {
        Tier::Auth => policy(
            5,
            15 * MINUTE,
            "Too many authentication attempts. Please try again in 15 minutes.",
        ),
        Tier::PasswordReset => policy(
            3,
            HOUR,
            "Too many password reset requests. Please try again in an hour.",
        ),
        Tier::Api => policy(100, MINUTE, "Too many requests. Please slow down."),
        Tier::Sensitive => policy(
            2,
            HOUR,
            "Too many attempts at a sensitive operation. Please try again later.",
        ),
        Tier::Booking => policy(
            20,
            MINUTE,
            "Too many booking requests. Please wait a moment before trying again.",
        ),
        Tier::Messaging => policy(
            30,
            MINUTE,
            "You are sending messages too quickly. Please slow down.",
        ),
        Tier::Feedback => policy(
            5,
            HOUR,
            "Too many feedback submissions. Please try again later.",
        ),
        Tier::Admin => policy(10, MINUTE, "Too many admin actions. Please slow down."),
        Tier::Payment => policy(
            15,
            MINUTE,
            "Too many payment requests. Please wait before trying again.",
        ),
        Tier::Financial => policy(
            1,
            MINUTE,
            "Only one financial operation is allowed per minute. Please wait before retrying.",
        ),
        Tier::Dispute => policy(
            3,
            HOUR,
            "Too many disputes filed. Please try again later.",
        ),
        Tier::Upload => policy(5, MINUTE, "Too many uploads. Please wait a moment."),
        Tier::Cron => policy(1, 5 * MINUTE, "Scheduled job already ran in this window."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(tier: Tier) -> (u64, Duration) {
        let catalogue = PolicyCatalogue::standard();
        let config = catalogue.get(tier);
        (config.max_requests(), config.window())
    }

    #[test]
    fn test_standard_tier_values() {
        assert_eq!(quota(Tier::Auth), (5, Duration::from_secs(900)));
        assert_eq!(quota(Tier::PasswordReset), (3, Duration::from_secs(3600)));
        assert_eq!(quota(Tier::Api), (100, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Sensitive), (2, Duration::from_secs(3600)));
        assert_eq!(quota(Tier::Booking), (20, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Messaging), (30, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Feedback), (5, Duration::from_secs(3600)));
        assert_eq!(quota(Tier::Admin), (10, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Payment), (15, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Financial), (1, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Dispute), (3, Duration::from_secs(3600)));
        assert_eq!(quota(Tier::Upload), (5, Duration::from_secs(60)));
        assert_eq!(quota(Tier::Cron), (1, Duration::from_secs(300)));
    }

    #[test]
    fn test_every_tier_has_a_distinct_message() {
        let catalogue = PolicyCatalogue::standard();
        let mut seen = std::collections::HashSet::new();
        for (tier, config) in catalogue.iter() {
            let message = config.message().unwrap_or_else(|| panic!("{} has no message", tier));
            assert!(seen.insert(message.to_string()), "{} reuses a message", tier);
        }
        assert_eq!(seen.len(), Tier::ALL.len());
    }

    #[test]
    fn test_tier_names_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(tier.name().parse::<Tier>().unwrap(), tier);
        }
        assert_eq!("passwordReset".parse::<Tier>().unwrap(), Tier::PasswordReset);
    }

    #[test]
    fn test_unknown_tier_fails_fast() {
        let catalogue = PolicyCatalogue::standard();
        let err = catalogue.lookup("premium").unwrap_err();
        assert!(matches!(err, TollgateError::UnknownTier(name) if name == "premium"));
        // Names are case sensitive.
        assert!(catalogue.lookup("Auth").is_err());
    }

    #[test]
    fn test_failure_policies() {
        assert_eq!(Tier::Financial.failure_policy(), FailurePolicy::Closed);
        assert_eq!(Tier::Sensitive.failure_policy(), FailurePolicy::Closed);
        assert_eq!(Tier::Api.failure_policy(), FailurePolicy::Open);
        assert_eq!(Tier::Payment.failure_policy(), FailurePolicy::Open);
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::new(0, Duration::from_secs(1)).is_err());
        assert!(RateLimitConfig::new(1, Duration::ZERO).is_err());
        assert!(RateLimitConfig::new(1, Duration::from_micros(500)).is_err());

        let config = RateLimitConfig::new(3, Duration::from_millis(1000)).unwrap();
        assert_eq!(config.window_ms(), 1000);
        assert!(config.message().is_none());
    }

    #[test]
    fn test_default_denial_message_embeds_retry() {
        let config = RateLimitConfig::new(3, Duration::from_secs(1)).unwrap();
        assert_eq!(
            config.denial_message(7),
            "Too many requests. Please try again in 7 seconds."
        );

        let config = config.with_message("custom");
        assert_eq!(config.denial_message(7), "custom");
    }
}
