/// Access Token Gate
///
/// Verifies the bearer token on every request to a protected scope and
/// injects the verified subject into request extensions for route handlers.
/// It authenticates only; ownership checks belong to the handlers.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use crate::auth::{TokenCodec, TokenOutcome, TokenPurpose};
use crate::error::{AppError, AuthError};

/// The caller behind an admitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl AuthenticatedSubject {
    /// Subject as a user ID
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.subject)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }
}

/// Extract `<token>` from `Authorization: Bearer <token>`
///
/// The scheme is case-insensitive; anything other than exactly two
/// space-separated parts is rejected.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Some(token)
        }
        _ => None,
    }
}

/// Decide whether a request may proceed
///
/// # Errors
/// - `MissingCredential` without a well-formed bearer header
/// - `InvalidToken` for malformed or forged tokens
/// - `TokenExpired` so clients know to refresh instead of logging in again
/// - `WrongTokenPurpose` for a genuine refresh token
pub fn admit(headers: &HeaderMap, codec: &TokenCodec) -> Result<AuthenticatedSubject, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredential)?;

    let claims = match codec.parse(token) {
        TokenOutcome::Valid(claims) => claims,
        TokenOutcome::Expired(claims) => {
            tracing::debug!(subject = %claims.sub, "Access token expired");
            return Err(AuthError::TokenExpired);
        }
        TokenOutcome::Malformed | TokenOutcome::SignatureMismatch => {
            return Err(AuthError::InvalidToken);
        }
    };

    if claims.purpose != TokenPurpose::Access {
        tracing::warn!(subject = %claims.sub, purpose = %claims.purpose, "Wrong token purpose");
        return Err(AuthError::WrongTokenPurpose);
    }

    Ok(AuthenticatedSubject {
        subject: claims.sub,
        issued_at: claims.iat,
        expires_at: claims.exp,
    })
}

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    codec: Arc<TokenCodec>,
}

impl JwtMiddleware {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    codec: Arc<TokenCodec>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match admit(req.headers(), &self.codec) {
            Ok(subject) => {
                tracing::debug!(subject = %subject.subject, "Request admitted");
                req.extensions_mut().insert(subject);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(reason) => Box::pin(async move { Err(AppError::Auth(reason).into()) }),
        }
    }
}
