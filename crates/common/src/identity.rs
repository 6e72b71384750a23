//! Shopper identity: authenticated user or anonymous session.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Opaque session token carried by anonymous shoppers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Creates a session token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The owner of a cart: exactly one of a registered user or an anonymous
/// session. The enum makes the never-both/never-neither rule structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CartIdentity {
    /// An authenticated shopper.
    User(UserId),
    /// An anonymous shopper identified by a session token.
    Session(SessionToken),
}

impl CartIdentity {
    /// Returns the user id when the identity is an authenticated shopper.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CartIdentity::User(id) => Some(*id),
            CartIdentity::Session(_) => None,
        }
    }

    /// Returns true for anonymous (session-token) identities.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CartIdentity::Session(_))
    }
}

impl std::fmt::Display for CartIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartIdentity::User(id) => write!(f, "user:{id}"),
            CartIdentity::Session(token) => write!(f, "session:{token}"),
        }
    }
}

impl From<UserId> for CartIdentity {
    fn from(id: UserId) -> Self {
        CartIdentity::User(id)
    }
}

impl From<SessionToken> for CartIdentity {
    fn from(token: SessionToken) -> Self {
        CartIdentity::Session(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_identity_exposes_user_id() {
        let user = UserId::new();
        let identity = CartIdentity::from(user);
        assert_eq!(identity.user_id(), Some(user));
        assert!(!identity.is_anonymous());
    }

    #[test]
    fn session_identity_is_anonymous() {
        let identity = CartIdentity::from(SessionToken::from("sess-123"));
        assert_eq!(identity.user_id(), None);
        assert!(identity.is_anonymous());
    }

    #[test]
    fn display_includes_kind() {
        let identity = CartIdentity::from(SessionToken::from("sess-123"));
        assert_eq!(identity.to_string(), "session:sess-123");
    }

    #[test]
    fn serialization_roundtrip() {
        let identity = CartIdentity::from(UserId::new());
        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: CartIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity, deserialized);
    }
}
