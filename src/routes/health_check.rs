use actix_web::HttpResponse;

/// Liveness probe; never touches the database
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
