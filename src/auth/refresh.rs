/// Refresh Token Exchange
///
/// Trades a valid refresh token for a new access/refresh pair without
/// re-checking the password. Tokens are stateless, so there is nothing
/// to look up or revoke; the subject comes from the verified token only.

use std::sync::Arc;

use crate::auth::claims::TokenPurpose;
use crate::auth::token::{TokenCodec, TokenOutcome, TokenPair};
use crate::error::AuthError;

pub struct RefreshExchanger {
    codec: Arc<TokenCodec>,
}

impl RefreshExchanger {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Exchange `refresh_token` for a new pair
    ///
    /// `subject_hint` is whatever the client claims to be. It is only
    /// compared against the token and logged; it never picks the subject.
    ///
    /// # Errors
    /// - `InvalidToken` if the token is malformed, forged, expired, or an
    ///   access token
    /// - `TokenIssuance` if signing the new pair fails
    pub fn refresh(
        &self,
        refresh_token: &str,
        subject_hint: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let claims = match self.codec.parse(refresh_token) {
            TokenOutcome::Valid(claims) => claims,
            TokenOutcome::Expired(claims) => {
                tracing::info!(subject = %claims.sub, "Refresh token expired");
                return Err(AuthError::InvalidToken);
            }
            outcome => {
                tracing::warn!(outcome = ?outcome, "Refresh token rejected");
                return Err(AuthError::InvalidToken);
            }
        };

        if claims.purpose != TokenPurpose::Refresh {
            tracing::warn!(
                subject = %claims.sub,
                purpose = %claims.purpose,
                "Non-refresh token presented for refresh"
            );
            return Err(AuthError::InvalidToken);
        }

        if let Some(hint) = subject_hint {
            if hint != claims.sub {
                tracing::warn!(
                    subject = %claims.sub,
                    hint = %hint,
                    "Ignoring subject hint that disagrees with the refresh token"
                );
            }
        }

        let pair = self.codec.issue_pair(&claims.sub)?;

        tracing::info!(subject = %claims.sub, "Token pair refreshed");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::JwtSettings;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(&JwtSettings {
                secret: "test-secret-key-at-least-32-characters-long".to_string(),
                access_token_expiry: 900,
                refresh_token_expiry: 604800,
                issuer: "test".to_string(),
            })
            .unwrap(),
        )
    }

    fn subject_of(codec: &TokenCodec, token: &str) -> String {
        codec
            .parse(token)
            .claims()
            .map(|claims| claims.sub.clone())
            .expect("Token should parse")
    }

    #[test]
    fn test_refresh_issues_a_new_pair_for_the_same_subject() {
        let codec = codec();
        let exchanger = RefreshExchanger::new(codec.clone());
        let original = codec.issue_pair("alice").unwrap();

        let refreshed = exchanger.refresh(&original.refresh_token, None).unwrap();

        assert_ne!(refreshed.refresh_token, original.refresh_token);
        assert_eq!(subject_of(&codec, &refreshed.access_token), "alice");
        assert!(codec.parse(&refreshed.access_token).is_valid());
    }

    #[test]
    fn test_subject_hint_never_overrides_token_subject() {
        let codec = codec();
        let exchanger = RefreshExchanger::new(codec.clone());
        let original = codec.issue_pair("alice").unwrap();

        let refreshed = exchanger
            .refresh(&original.refresh_token, Some("mallory"))
            .unwrap();

        assert_eq!(subject_of(&codec, &refreshed.access_token), "alice");
        assert_eq!(subject_of(&codec, &refreshed.refresh_token), "alice");
    }

    #[test]
    fn test_access_token_cannot_be_used_to_refresh() {
        let codec = codec();
        let exchanger = RefreshExchanger::new(codec.clone());
        let pair = codec.issue_pair("alice").unwrap();

        let result = exchanger.refresh(&pair.access_token, None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_expired_refresh_token_is_rejected() {
        let codec = codec();
        let exchanger = RefreshExchanger::new(codec.clone());
        let token = codec.issue("alice", TokenPurpose::Refresh, 0).unwrap();

        assert_eq!(exchanger.refresh(&token, None).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let exchanger = RefreshExchanger::new(codec());

        assert_eq!(
            exchanger.refresh("definitely-not-a-token", None).unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
