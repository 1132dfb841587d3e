use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer};
use serde_json::{json, Value};
use workout_api::auth::{
    Credential, InMemoryCredentialStore, RefreshExchanger, SessionIssuer, TokenCodec,
};
use workout_api::configuration::JwtSettings;
use workout_api::logger::LoggerMiddleware;
use workout_api::startup::{api_routes, REQUEST_TIMEOUT};

const PASSWORD: &str = "Correct-Horse-9";

pub struct TestApp {
    pub address: String,
    pub subject: String,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/login", &self.address))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login_ok(&self) -> Value {
        let response = self.login("alice", PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn refresh(&self, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/refresh", &self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn session(&self, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}/api/v1/auth/session", &self.address));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }
}

fn spawn_app_with_ttl(access_ttl: i64, refresh_ttl: i64) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let codec = Arc::new(
        TokenCodec::new(&JwtSettings {
            secret: "integration-secret-key-at-least-32-bytes".to_string(),
            access_token_expiry: access_ttl,
            refresh_token_expiry: refresh_ttl,
            issuer: "workout_api".to_string(),
        })
        .expect("Failed to build token codec"),
    );

    let subject = uuid::Uuid::new_v4().to_string();
    let store = InMemoryCredentialStore::new();
    store.insert(Credential {
        subject_id: subject.clone(),
        username: "alice".to_string(),
        password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
    });

    let issuer = actix_web::web::Data::new(SessionIssuer::new(Arc::new(store), codec.clone()));
    let exchanger = actix_web::web::Data::new(RefreshExchanger::new(codec.clone()));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware::new(REQUEST_TIMEOUT))
            .app_data(issuer.clone())
            .app_data(exchanger.clone())
            .configure(|cfg| api_routes(cfg, codec.clone()))
    })
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let _ = tokio::spawn(server);

    TestApp {
        address,
        subject,
        client: reqwest::Client::new(),
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with_ttl(900, 604800)
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("missing token").to_string()
}

// --- Login ---

#[tokio::test]
async fn login_returns_token_pair_for_valid_credentials() {
    let app = spawn_app();

    let body = app.login_ok().await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(token(&body, "access_token").split('.').count(), 3);
    assert_ne!(token(&body, "access_token"), token(&body, "refresh_token"));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let app = spawn_app();

    let wrong_password = app.login("alice", "Wrong-Horse-9").await;
    let unknown_user = app.login("mallory", PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_user.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a["code"], "UNAUTHORIZED");
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["status"], b["status"]);
}

// --- Auth gate ---

#[tokio::test]
async fn protected_route_admits_access_token() {
    let app = spawn_app();
    let tokens = app.login_ok().await;

    let response = app.session(Some(&token(&tokens, "access_token"))).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["subject"], app.subject.as_str());
    assert_eq!(
        body["expires_at"].as_i64().unwrap() - body["issued_at"].as_i64().unwrap(),
        900
    );
}

#[tokio::test]
async fn protected_route_rejects_missing_or_malformed_header() {
    let app = spawn_app();
    let tokens = app.login_ok().await;
    let access = token(&tokens, "access_token");

    let missing = app.session(None).await;
    assert_eq!(401, missing.status().as_u16());
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let headers = vec![
        format!("Token {}", access),
        format!("Bearer  {}", access),
        "Bearer".to_string(),
        access.clone(),
    ];
    for header in headers {
        let response = app
            .client
            .get(&format!("{}/api/v1/auth/session", &app.address))
            .header("Authorization", header.as_str())
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16(), "Should reject header: {}", header);
    }
}

#[tokio::test]
async fn protected_route_rejects_tampered_token() {
    let app = spawn_app();
    let tokens = app.login_ok().await;
    let access = token(&tokens, "access_token");

    let (head, signature) = access.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", head, flipped, &signature[1..]);

    let response = app.session(Some(&tampered)).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn refresh_token_cannot_open_protected_routes() {
    let app = spawn_app();
    let tokens = app.login_ok().await;

    let response = app.session(Some(&token(&tokens, "refresh_token"))).await;

    assert_eq!(401, response.status().as_u16());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_returns_new_pair_for_refresh_token() {
    let app = spawn_app();
    let tokens = app.login_ok().await;

    let response = app
        .refresh(json!({ "refresh_token": token(&tokens, "refresh_token") }))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");

    let session = app.session(Some(&token(&body, "access_token"))).await;
    assert_eq!(200, session.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app();
    let tokens = app.login_ok().await;

    let response = app
        .refresh(json!({ "refresh_token": token(&tokens, "access_token") }))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_takes_subject_from_token_not_from_hint() {
    let app = spawn_app();
    let tokens = app.login_ok().await;
    let someone_else = uuid::Uuid::new_v4().to_string();

    let response = app
        .refresh(json!({
            "refresh_token": token(&tokens, "refresh_token"),
            "user_id": someone_else,
        }))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();

    let session: Value = app
        .session(Some(&token(&body, "access_token")))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(session["subject"], app.subject.as_str());
}

#[tokio::test]
async fn expired_access_token_is_recovered_through_refresh() {
    let app = spawn_app_with_ttl(2, 60);
    let tokens = app.login_ok().await;
    let access = token(&tokens, "access_token");

    assert_eq!(200, app.session(Some(&access)).await.status().as_u16());

    tokio::time::sleep(Duration::from_secs(3)).await;

    let expired = app.session(Some(&access)).await;
    assert_eq!(401, expired.status().as_u16());
    let body: Value = expired.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_EXPIRED");

    let refreshed = app
        .refresh(json!({ "refresh_token": token(&tokens, "refresh_token") }))
        .await;
    assert_eq!(200, refreshed.status().as_u16());
    let body: Value = refreshed.json().await.unwrap();

    let session = app.session(Some(&token(&body, "access_token"))).await;
    assert_eq!(200, session.status().as_u16());
}

#[tokio::test]
async fn error_body_carries_the_request_id() {
    let app = spawn_app();

    let response = app.session(None).await;

    assert_eq!(401, response.status().as_u16());
    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("missing x-request-id header")
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error_id"], request_id.as_str());
}
