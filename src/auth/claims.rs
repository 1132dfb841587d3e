/// Token Claims
///
/// Typed payload of every token the codec signs. Only `TokenCodec`
/// constructs claims; everything else reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a token may be used for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Authorizes individual API requests
    Access,
    /// Only exchangeable for a new token pair
    Refresh,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPurpose::Access => write!(f, "access"),
            TokenPurpose::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub purpose: TokenPurpose,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    pub(crate) fn new(
        subject: &str,
        purpose: TokenPurpose,
        issued_at: i64,
        ttl_seconds: i64,
        issuer: &str,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            purpose,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_seconds),
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// A token is expired from its `exp` second onwards
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new("alice", TokenPurpose::Access, 1_000, 900, "test");

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.purpose, TokenPurpose::Access);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_900);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims::new("alice", TokenPurpose::Access, 1_000, 60, "test");

        assert!(!claims.is_expired_at(1_059));
        assert!(claims.is_expired_at(1_060));
        assert!(claims.is_expired_at(1_061));
    }

    #[test]
    fn test_each_token_gets_its_own_id() {
        let first = Claims::new("alice", TokenPurpose::Refresh, 1_000, 60, "test");
        let second = Claims::new("alice", TokenPurpose::Refresh, 1_000, 60, "test");

        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_purpose_serializes_lowercase() {
        let claims = Claims::new("alice", TokenPurpose::Refresh, 1_000, 60, "test");
        let json = serde_json::to_value(&claims).expect("Failed to serialize claims");

        assert_eq!(json["purpose"], "refresh");
    }
}
