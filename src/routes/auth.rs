/// Authentication Routes
///
/// Handles login, token refresh, and introspection of the current session.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{RefreshExchanger, SessionIssuer, TokenPair};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedSubject;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    /// Accepted for older clients; never trusted over the token itself
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

/// Current session information
#[derive(Serialize)]
pub struct SessionResponse {
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// POST /api/v1/auth/login
///
/// Authenticate with username and password.
///
/// # Errors
/// - 401: Invalid credentials (unknown user or wrong password, same body)
/// - 500: Token issuance failed
pub async fn login(
    form: web::Json<LoginRequest>,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let pair = issuer
        .authenticate(form.username.trim(), &form.password)
        .await?;

    tracing::info!(request_id = %context.request_id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new token pair.
///
/// # Errors
/// - 401: Invalid, expired, or non-refresh token
/// - 500: Token issuance failed
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    exchanger: web::Data<RefreshExchanger>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let pair = exchanger.refresh(&form.refresh_token, form.user_id.as_deref())?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// GET /api/v1/auth/session
///
/// **Requires valid access token.** Describes the token the request was admitted with.
pub async fn session_info(subject: web::ReqData<AuthenticatedSubject>) -> HttpResponse {
    let subject = subject.into_inner();

    HttpResponse::Ok().json(SessionResponse {
        subject: subject.subject,
        issued_at: subject.issued_at,
        expires_at: subject.expires_at,
    })
}
