//! Cart status machine.

use serde::{Deserialize, Serialize};

/// The status of a cart in its lifecycle.
///
/// Status transitions:
/// ```text
/// Active ──► CheckingOut ──► Completed
///    ▲            │
///    └────────────┘ (payment failed; shopper retries)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Cart accepts item mutations.
    #[default]
    Active,

    /// A checkout was initiated; a provisional order references this cart.
    CheckingOut,

    /// Payment was confirmed and the cart was emptied (terminal state).
    Completed,
}

impl CartStatus {
    /// Returns true if items can be added, updated, or removed.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, CartStatus::Active)
    }

    /// Returns true if a checkout can be initiated from this status.
    pub fn can_begin_checkout(&self) -> bool {
        matches!(self, CartStatus::Active)
    }

    /// Returns true while the cart counts toward the one-open-cart-per-identity rule.
    pub fn is_open(&self) -> bool {
        matches!(self, CartStatus::Active | CartStatus::CheckingOut)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::CheckingOut => "checking_out",
            CartStatus::Completed => "completed",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CartStatus::Active),
            "checking_out" => Some(CartStatus::CheckingOut),
            "completed" => Some(CartStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_active() {
        assert_eq!(CartStatus::default(), CartStatus::Active);
    }

    #[test]
    fn only_active_carts_accept_mutations() {
        assert!(CartStatus::Active.can_modify_items());
        assert!(!CartStatus::CheckingOut.can_modify_items());
        assert!(!CartStatus::Completed.can_modify_items());
    }

    #[test]
    fn only_active_carts_can_begin_checkout() {
        assert!(CartStatus::Active.can_begin_checkout());
        assert!(!CartStatus::CheckingOut.can_begin_checkout());
        assert!(!CartStatus::Completed.can_begin_checkout());
    }

    #[test]
    fn open_statuses() {
        assert!(CartStatus::Active.is_open());
        assert!(CartStatus::CheckingOut.is_open());
        assert!(!CartStatus::Completed.is_open());
    }

    #[test]
    fn string_roundtrip() {
        for status in [
            CartStatus::Active,
            CartStatus::CheckingOut,
            CartStatus::Completed,
        ] {
            assert_eq!(CartStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CartStatus::parse("bogus"), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&CartStatus::CheckingOut).unwrap(),
            "\"checking_out\""
        );
    }
}
