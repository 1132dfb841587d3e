/// Login
///
/// Verifies a username/password pair and mints a fresh token pair.

use std::sync::Arc;

use crate::auth::password::{equalize_timing, prepare_timing_equalization, verify_password};
use crate::auth::store::CredentialStore;
use crate::auth::token::{TokenCodec, TokenPair};
use crate::error::{AppError, AuthError};

pub struct SessionIssuer {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl SessionIssuer {
    /// Blocks for one bcrypt hash the first time it is called in a process
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        prepare_timing_equalization();
        Self { store, codec }
    }

    /// Check the credentials and issue an access/refresh pair
    ///
    /// An unknown username and a wrong password fail identically, and take
    /// about as long. The bcrypt check runs on the calling worker.
    ///
    /// # Errors
    /// - `Auth(InvalidCredentials)` for an unknown user or wrong password
    /// - `Auth(TokenIssuance)` if signing fails
    /// - `Database(..)` if the store lookup fails
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let credential = match self.store.lookup_by_username(username).await? {
            Some(credential) => credential,
            None => {
                equalize_timing(password);
                tracing::debug!("Login attempt for unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_password(password, &credential.password_hash) {
            tracing::debug!(subject = %credential.subject_id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.codec.issue_pair(&credential.subject_id)?;

        tracing::info!(subject = %credential.subject_id, "Session issued");
        Ok(pair)
    }
}
