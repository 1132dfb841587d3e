/// Token Codec
///
/// Issues and parses signed, expiring tokens (JWT compact form, HS256).
/// A token verifies if and only if it was signed with the configured secret
/// and its `exp` has not been reached.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{Claims, TokenPurpose};
use crate::configuration::JwtSettings;
use crate::error::{AuthError, ConfigError};

/// Result of parsing a token
///
/// Claims are only available when the signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Valid(Claims),
    /// Genuine token past its expiry; claims are kept for logging only
    Expired(Claims),
    Malformed,
    SignatureMismatch,
}

impl TokenOutcome {
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            TokenOutcome::Valid(claims) | TokenOutcome::Expired(claims) => Some(claims),
            TokenOutcome::Malformed | TokenOutcome::SignatureMismatch => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TokenOutcome::Valid(_))
    }
}

/// Access and refresh token minted together
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signs and verifies tokens with one process-wide secret
///
/// Built once at startup and shared read-only between workers.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenCodec {
    /// Build a codec from validated settings
    ///
    /// # Errors
    /// Returns the configuration problem if the settings are unusable
    /// (see `JwtSettings::validate`)
    pub fn new(settings: &JwtSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Expiry is decided in `parse_at` so expired claims can still be returned.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            access_ttl: settings.access_token_expiry,
            refresh_ttl: settings.refresh_token_expiry,
        })
    }

    /// Sign a token for `subject`, valid for `ttl_seconds` from now
    ///
    /// # Errors
    /// Returns `TokenIssuance` if signing fails
    pub fn issue(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        self.issue_at(subject, purpose, ttl_seconds, chrono::Utc::now().timestamp())
    }

    /// Same as `issue`, with an explicit issue time (Unix seconds)
    pub fn issue_at(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl_seconds: i64,
        now: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims::new(subject, purpose, now, ttl_seconds, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }

    /// Mint an access/refresh pair for `subject` with the configured lifetimes
    ///
    /// # Errors
    /// Returns `TokenIssuance` if either token cannot be signed; no partial
    /// pair is ever returned.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let access_token = self.issue_at(subject, TokenPurpose::Access, self.access_ttl, now)?;
        let refresh_token = self.issue_at(subject, TokenPurpose::Refresh, self.refresh_ttl, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl,
        })
    }

    pub fn parse(&self, token: &str) -> TokenOutcome {
        self.parse_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify `token` as of `now` (Unix seconds)
    pub fn parse_at(&self, token: &str, now: i64) -> TokenOutcome {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::InvalidSignature => TokenOutcome::SignatureMismatch,
                    _ => {
                        tracing::debug!(error = %e, "Rejecting malformed token");
                        TokenOutcome::Malformed
                    }
                };
            }
        };

        if claims.is_expired_at(now) {
            TokenOutcome::Expired(claims)
        } else {
            TokenOutcome::Valid(claims)
        }
    }
}
