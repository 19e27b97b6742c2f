//! Composite counter keys.

use super::policy::Tier;

/// A key that uniquely identifies one caller's counter within one tier.
///
/// The same identifier is tracked independently per tier, so a caller's
/// `auth` attempts never share a counter with their `api` calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// The tier whose quota applies
    pub tier: Tier,
    /// The caller identifier, typically a client address
    pub identifier: String,
}

impl CounterKey {
    pub fn new(identifier: impl Into<String>, tier: Tier) -> Self {
        Self {
            tier,
            identifier: identifier.into(),
        }
    }

    /// Serialized form used as the store key.
    ///
    /// The tier comes first because identifiers (IPv6 addresses) may
    /// themselves contain `:`.
    pub fn to_string_key(&self) -> String {
        format!("{}:{}", self.tier.name(), self.identifier)
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_key())
    }
}
