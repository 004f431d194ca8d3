use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use mailings::auth;
use mailings::config::Config;
use mailings::db;
use mailings::infrastructure::AppState;
use mailings::mail::{MemoryMailer, Templates};
use mailings::models::user::{self, ROLE_USER};
use mailings::server::build_router;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test app with one active user, returning their token
async fn setup_test_app(mailer: MemoryMailer) -> (Router, String) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");

    let now = chrono::Utc::now().to_rfc3339();
    let user = user::ActiveModel {
        email: Set("tester@example.com".to_string()),
        password_hash: Set("hash".to_string()),
        full_name: Set("Tester".to_string()),
        role: Set(ROLE_USER.to_string()),
        is_active: Set(true),
        email_verified: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("Failed to create user");

    let state = AppState::new(
        db,
        Config::from_lookup(|_| None),
        Arc::new(mailer),
        Templates::new().expect("templates"),
    );
    let token = auth::create_jwt(user.id, &user.role).expect("Failed to create token");
    (build_router(state), token)
}

async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_get_client_not_found() {
    let (app, token) = setup_test_app(MemoryMailer::default()).await;

    let req = Request::builder()
        .uri("/api/clients/999")
        .method("GET")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/clients/999",
        &token,
        json!({ "email": "x@example.com", "full_name": "X" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_invalid_client_input() {
    let (app, token) = setup_test_app(MemoryMailer::default()).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/clients",
        &token,
        json!({ "email": "not-an-email", "full_name": "X" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/clients",
        &token,
        json!({ "email": "ok@example.com", "full_name": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/messages",
        &token,
        json!({ "subject": "  ", "body": "text" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_mailing_payloads() {
    let (app, token) = setup_test_app(MemoryMailer::default()).await;

    // Start times are whole hours only
    let (status, _) = send(
        &app,
        "POST",
        "/api/mailings",
        &token,
        json!({ "start_time": "09:30", "frequency": "daily" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "POST",
        "/api/mailings",
        &token,
        json!({ "start_time": "09:00", "frequency": "hourly" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        "/api/mailings",
        &token,
        json!({ "start_time": "09:00", "frequency": "daily", "message_id": 12 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("12"));
}

#[tokio::test]
async fn test_registration_mail_failure_is_bad_gateway() {
    let mailer = MemoryMailer::default();
    mailer.reject("unlucky@example.com").await;
    let (app, token) = setup_test_app(mailer).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/users/register",
        &token,
        json!({ "email": "unlucky@example.com", "password": "long-enough-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // The half-registered account was rolled back, so the address is free again
    let (status, _) = send(
        &app,
        "POST",
        "/api/users/register",
        &token,
        json!({ "email": "unlucky@example.com", "password": "long-enough-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_short_password_rejected() {
    let (app, token) = setup_test_app(MemoryMailer::default()).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/users/register",
        &token,
        json!({ "email": "short@example.com", "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
