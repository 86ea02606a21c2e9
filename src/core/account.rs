use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an account holding positions in the engine.
///
/// An account can represent an end-user wallet, a treasury, a
/// market-making desk, or any entity that deposits collateral and mints
/// the synthetic dollar. Accounts are implicit: they come into existence
/// on first deposit or mint and are never explicitly registered.
///
/// # Examples
///
/// ```
/// use issuance_engine::core::account::AccountId;
///
/// let alice = AccountId::new("alice");
/// let bob = AccountId::new("bob");
/// assert_ne!(alice, bob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this account ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
