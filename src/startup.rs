use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{PgCredentialStore, RefreshExchanger, SessionIssuer, TokenCodec};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_record, delete_record, delete_user, get_current_user, get_record, get_user,
    health_check, list_user_records, login, refresh, register, session_info, update_record,
    update_user,
};

/// Upper bound on handling a single request, including the password hash
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const CLIENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Route table
///
/// Expects `PgPool`, `SessionIssuer` and `RefreshExchanger` in app data.
/// Public routes are registered ahead of the `/api/v1` scope so the gate
/// never sees them.
pub fn api_routes(cfg: &mut web::ServiceConfig, codec: Arc<TokenCodec>) {
    cfg
        // Public routes (no authentication required)
        .route("/health_check", web::get().to(health_check))
        .route("/api/v1/user", web::post().to(register))
        .route("/api/v1/auth/login", web::post().to(login))
        .route("/api/v1/auth/refresh", web::post().to(refresh))
        // Protected routes (require a valid access token)
        .service(
            web::scope("/api/v1")
                .wrap(JwtMiddleware::new(codec))
                .route("/auth/session", web::get().to(session_info))
                .route("/me", web::get().to(get_current_user))
                .route("/user/{id}", web::get().to(get_user))
                .route("/user/{id}", web::put().to(update_user))
                .route("/user/{id}", web::delete().to(delete_user))
                .route("/user/{id}/records", web::get().to(list_user_records))
                .route("/record", web::post().to(create_record))
                .route("/record/{id}", web::get().to(get_record))
                .route("/record/{id}", web::put().to(update_record))
                .route("/record/{id}", web::delete().to(delete_record)),
        );
}

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    codec: Arc<TokenCodec>,
) -> Result<Server, std::io::Error> {
    let store = Arc::new(PgCredentialStore::new(connection.clone()));
    let issuer = web::Data::new(SessionIssuer::new(store, codec.clone()));
    let exchanger = web::Data::new(RefreshExchanger::new(codec.clone()));
    let connection = web::Data::new(connection);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware::new(REQUEST_TIMEOUT))
            .app_data(connection.clone())
            .app_data(issuer.clone())
            .app_data(exchanger.clone())
            .configure(|cfg| api_routes(cfg, codec.clone()))
    })
    .client_request_timeout(CLIENT_REQUEST_TIMEOUT)
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
    .listen(listener)?
    .run();

    Ok(server)
}
