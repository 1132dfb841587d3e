/// Credential lookup
///
/// The auth core never writes credentials; it only asks a store for the
/// stored hash belonging to a username.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// What the store hands back for a username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub subject_id: String,
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no such user exists
    async fn lookup_by_username(&self, username: &str) -> Result<Option<Credential>, AppError>;
}

/// Postgres-backed store reading the `users` table
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn lookup_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, username, password_hash)| Credential {
            subject_id: id.to_string(),
            username,
            password_hash,
        }))
    }
}

/// Map-backed store for tests and local tooling
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: Credential) {
        if let Ok(mut credentials) = self.credentials.write() {
            credentials.insert(credential.username.clone(), credential);
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let credentials = self
            .credentials
            .read()
            .map_err(|_| AppError::Internal("Credential store lock poisoned".to_string()))?;

        Ok(credentials.get(username).cloned())
    }
}
