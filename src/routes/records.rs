/// Record Routes
///
/// Short messages owned by their author. Anyone signed in can read a
/// record; only the author can change or remove it.

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedSubject;
use crate::validators::is_valid_message_body;

#[derive(Deserialize)]
pub struct RecordRequest {
    pub message_body: String,
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub id: String,
    pub author: String,
    pub message_body: String,
    pub date_created: String,
}

type RecordRow = (Uuid, Uuid, String, NaiveDate);

impl From<RecordRow> for RecordResponse {
    fn from((id, author, message_body, date_created): RecordRow) -> Self {
        Self {
            id: id.to_string(),
            author: author.to_string(),
            message_body,
            date_created: date_created.format("%Y-%m-%d").to_string(),
        }
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::Validation(ValidationError::InvalidFormat(field.to_string())))
}

fn record_not_found() -> AppError {
    AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
}

/// POST /api/v1/record
///
/// The author is always the caller; `date_created` is today (UTC).
pub async fn create_record(
    form: web::Json<RecordRequest>,
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("record_creation").with_user_id(subject.subject.clone());
    let author = subject.user_id()?;
    let message_body = is_valid_message_body(&form.message_body)?;

    let id = Uuid::new_v4();
    let today = Utc::now().date_naive();
    sqlx::query(
        r#"
        INSERT INTO records (id, author, message_body, date_created, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(author)
    .bind(&message_body)
    .bind(today)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(request_id = %context.request_id, record_id = %id, "Record created");

    Ok(HttpResponse::Created().json(RecordResponse::from((id, author, message_body, today))))
}

/// GET /api/v1/record/{id}
pub async fn get_record(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "record id")?;

    let record = sqlx::query_as::<_, RecordRow>(
        "SELECT id, author, message_body, date_created FROM records WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(record_not_found)?;

    Ok(HttpResponse::Ok().json(RecordResponse::from(record)))
}

/// GET /api/v1/user/{id}/records
///
/// Newest first.
pub async fn list_user_records(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let author = parse_id(&path, "user id")?;

    let records = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT id, author, message_body, date_created
        FROM records
        WHERE author = $1
        ORDER BY date_created DESC, updated_at DESC
        "#,
    )
    .bind(author)
    .fetch_all(pool.get_ref())
    .await?;

    let records: Vec<RecordResponse> = records.into_iter().map(RecordResponse::from).collect();
    Ok(HttpResponse::Ok().json(records))
}

/// PUT /api/v1/record/{id}
///
/// Records belonging to someone else answer 404, same as missing ones.
pub async fn update_record(
    path: web::Path<String>,
    form: web::Json<RecordRequest>,
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("record_update").with_user_id(subject.subject.clone());
    let id = parse_id(&path, "record id")?;
    let author = subject.user_id()?;
    let message_body = is_valid_message_body(&form.message_body)?;

    let record = sqlx::query_as::<_, RecordRow>(
        r#"
        UPDATE records
        SET message_body = $1, updated_at = $2
        WHERE id = $3 AND author = $4
        RETURNING id, author, message_body, date_created
        "#,
    )
    .bind(&message_body)
    .bind(Utc::now())
    .bind(id)
    .bind(author)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(record_not_found)?;

    tracing::info!(request_id = %context.request_id, record_id = %id, "Record updated");

    Ok(HttpResponse::Ok().json(RecordResponse::from(record)))
}

/// DELETE /api/v1/record/{id}
pub async fn delete_record(
    path: web::Path<String>,
    subject: web::ReqData<AuthenticatedSubject>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("record_deletion").with_user_id(subject.subject.clone());
    let id = parse_id(&path, "record id")?;
    let author = subject.user_id()?;

    let deleted = sqlx::query("DELETE FROM records WHERE id = $1 AND author = $2")
        .bind(id)
        .bind(author)
        .execute(pool.get_ref())
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(record_not_found());
    }

    tracing::info!(request_id = %context.request_id, record_id = %id, "Record deleted");

    Ok(HttpResponse::NoContent().finish())
}
