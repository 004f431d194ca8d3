use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use mailings::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use mailings::config::Config;
use mailings::db;
use mailings::infrastructure::AppState;
use mailings::mail::{MemoryMailer, Templates};
use mailings::models::user::{self, ROLE_MANAGER, ROLE_USER};
use mailings::server::build_router;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn app_for(db: DatabaseConnection) -> Router {
    let state = AppState::new(
        db,
        Config::from_lookup(|_| None),
        Arc::new(MemoryMailer::new("noreply@localhost")),
        Templates::new().expect("templates"),
    );
    build_router(state)
}

async fn insert_user(db: &DatabaseConnection, email: &str, role: &str, active: bool) -> user::Model {
    let now = chrono::Utc::now().to_rfc3339();
    user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(hash_password("user_password").unwrap()),
        full_name: Set(String::new()),
        role: Set(role.to_string()),
        is_active: Set(active),
        email_verified: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
async fn test_jwt_creation_and_verification() {
    let token = create_jwt(42, ROLE_MANAGER).expect("Failed to create JWT");
    assert!(!token.is_empty());

    let claims = decode_jwt(&token).expect("Failed to verify JWT");
    assert_eq!(claims.user_id().unwrap(), 42);
    assert!(claims.is_manager());

    assert!(decode_jwt("not.a.token").is_err());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = app_for(setup_test_db().await);

    assert_eq!(call(&app, "GET", "/api/clients", None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(call(&app, "GET", "/api/mailings", None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        call(&app, "GET", "/api/clients", Some("garbage")).await,
        StatusCode::UNAUTHORIZED
    );
    // Public routes
    assert_eq!(call(&app, "GET", "/api/blog", None).await, StatusCode::OK);
    assert_eq!(call(&app, "GET", "/api/health", None).await, StatusCode::OK);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = app_for(setup_test_db().await);
    let token = create_jwt(999, ROLE_USER).unwrap();
    assert_eq!(
        call(&app, "GET", "/api/clients", Some(&token)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_manager_routes_are_forbidden_to_users() {
    let db = setup_test_db().await;
    let user = insert_user(&db, "user@example.com", ROLE_USER, true).await;
    let app = app_for(db);

    let token = create_jwt(user.id, &user.role).unwrap();
    assert_eq!(
        call(&app, "GET", "/api/users/manager", Some(&token)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        call(&app, "POST", "/api/users/manager/users/1/block", Some(&token)).await,
        StatusCode::FORBIDDEN
    );

    // A forged role claim does not help: the stored role is checked too
    let forged = create_jwt(user.id, ROLE_MANAGER).unwrap();
    assert_eq!(
        call(&app, "GET", "/api/users/manager", Some(&forged)).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_promoted_user_reaches_manager_routes_with_old_token() {
    let db = setup_test_db().await;
    // Promoted after the token below was issued
    let promoted = insert_user(&db, "promoted@example.com", ROLE_MANAGER, true).await;
    let app = app_for(db);

    let stale = create_jwt(promoted.id, ROLE_USER).unwrap();
    assert_eq!(
        call(&app, "GET", "/api/users/manager", Some(&stale)).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_blocked_user_loses_access() {
    let db = setup_test_db().await;
    let manager = insert_user(&db, "boss@example.com", ROLE_MANAGER, true).await;
    let user = insert_user(&db, "user@example.com", ROLE_USER, true).await;
    let app = app_for(db);

    let manager_token = create_jwt(manager.id, &manager.role).unwrap();
    let user_token = create_jwt(user.id, &user.role).unwrap();

    assert_eq!(call(&app, "GET", "/api/clients", Some(&user_token)).await, StatusCode::OK);

    let block = format!("/api/users/manager/users/{}/block", user.id);
    assert_eq!(call(&app, "POST", &block, Some(&manager_token)).await, StatusCode::OK);
    assert_eq!(
        call(&app, "GET", "/api/clients", Some(&user_token)).await,
        StatusCode::FORBIDDEN
    );

    let unblock = format!("/api/users/manager/users/{}/unblock", user.id);
    assert_eq!(call(&app, "POST", &unblock, Some(&manager_token)).await, StatusCode::OK);
    assert_eq!(call(&app, "GET", "/api/clients", Some(&user_token)).await, StatusCode::OK);

    // Managers cannot be blocked
    let block_manager = format!("/api/users/manager/users/{}/block", manager.id);
    assert_eq!(
        call(&app, "POST", &block_manager, Some(&manager_token)).await,
        StatusCode::FORBIDDEN
    );
}
