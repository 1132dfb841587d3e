/// User Routes
///
/// Registration and self-service account management.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedSubject;
use crate::validators::is_valid_username;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Partial user update
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// User information response (never includes the hash)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::Validation(ValidationError::InvalidFormat("user id".to_string())))
}

fn ensure_self(subject: &AuthenticatedSubject, user_id: Uuid) -> Result<(), AppError> {
    if subject.user_id()? != user_id {
        return Err(AppError::Forbidden(
            "users may only modify their own account".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_user(pool: &PgPool, user_id: Uuid) -> Result<UserResponse, AppError> {
    let user = sqlx::query_as::<_, (Uuid, String, chrono::DateTime<Utc>)>(
        "SELECT id, username, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("User not found".to_string())))?;

    Ok(UserResponse {
        id: user.0.to_string(),
        username: user.1,
        created_at: user.2.to_rfc3339(),
    })
}

/// POST /api/v1/user
///
/// Register a new user.
///
/// # Errors
/// - 400: Invalid username or weak password
/// - 409: Username already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let username = is_valid_username(&form.username)?;
    let password_hash = hash_password(&form.password)?;

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&username)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse {
        id: user_id.to_string(),
        username,
        created_at: now.to_rfc3339(),
    }))
}

/// GET /api/v1/me
///
/// **Requires valid access token.**
pub async fn get_current_user(
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = fetch_user(pool.get_ref(), subject.user_id()?).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/v1/user/{id}
pub async fn get_user(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = parse_user_id(&path)?;
    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/v1/user/{id}
///
/// # Errors
/// - 400: Nothing to update, or invalid values
/// - 403: Updating another user
/// - 409: New username already taken
pub async fn update_user(
    path: web::Path<String>,
    form: web::Json<UpdateUserRequest>,
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_update").with_user_id(subject.subject.clone());
    let user_id = parse_user_id(&path)?;
    ensure_self(&subject, user_id)?;

    let form = form.into_inner();
    if form.username.is_none() && form.password.is_none() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "username or password".to_string(),
        )));
    }

    let username = form.username.as_deref().map(is_valid_username).transpose()?;
    let password_hash = form.password.as_deref().map(hash_password).transpose()?;

    let updated = sqlx::query(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            password_hash = COALESCE($2, password_hash),
            updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool.get_ref())
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Database(DatabaseError::NotFound("User not found".to_string())));
    }

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "User updated");

    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/v1/user/{id}
///
/// Deletes the caller's account and, by cascade, their records.
/// Already issued tokens stay valid until they expire.
pub async fn delete_user(
    path: web::Path<String>,
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_deletion").with_user_id(subject.subject.clone());
    let user_id = parse_user_id(&path)?;
    ensure_self(&subject, user_id)?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::Database(DatabaseError::NotFound("User not found".to_string())));
    }

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}
