pub mod attempts;
pub mod blog;
pub mod clients;
pub mod health;
pub mod mailings;
pub mod manager;
pub mod messages;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::domain::{Actor, DomainError};
use crate::infrastructure::AppState;
use crate::services::user_service;

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = match &self {
            DomainError::NotFound => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Mail(_) => StatusCode::BAD_GATEWAY,
            DomainError::Database(_) | DomainError::Internal(_) => {
                tracing::error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            DomainError::NotFound => "Not found".to_string(),
            DomainError::Validation(msg)
            | DomainError::Unauthorized(msg)
            | DomainError::Forbidden(msg)
            | DomainError::Conflict(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Resolve the token holder against the database: blocked or deleted
/// accounts lose access even while their token is still valid.
pub async fn current_actor(db: &DatabaseConnection, claims: &Claims) -> Result<Actor, DomainError> {
    let user_id = claims.user_id()?;
    let user = user_service::get_user(db, user_id)
        .await
        .map_err(|e| match e {
            DomainError::NotFound => DomainError::Unauthorized("Unknown user".to_string()),
            other => other,
        })?;

    if !user.is_active {
        return Err(DomainError::Forbidden("Account is not active".to_string()));
    }

    Ok(Actor {
        user_id: user.id,
        is_manager: user.is_manager(),
    })
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Users
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/verify_email/:token", get(users::verify_email))
        .route("/users/activate/:token", get(users::activate))
        .route("/users/password_reset", post(users::password_reset))
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        // Manager
        .route("/users/manager", get(manager::overview))
        .route("/users/manager/users/:id/block", post(manager::block_user))
        .route("/users/manager/users/:id/unblock", post(manager::unblock_user))
        .route(
            "/users/manager/mailings/:id/complete",
            post(manager::complete_mailing),
        )
        // Clients
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        // Messages
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/messages/:id",
            get(messages::get_message)
                .put(messages::update_message)
                .delete(messages::delete_message),
        )
        // Mailings
        .route(
            "/mailings",
            get(mailings::list_mailings).post(mailings::create_mailing),
        )
        .route("/mailings/options", get(mailings::mailing_options))
        .route(
            "/mailings/:id",
            get(mailings::get_mailing)
                .put(mailings::update_mailing)
                .delete(mailings::delete_mailing),
        )
        .route("/mailings/:id/attempts", get(mailings::list_mailing_attempts))
        // Delivery attempts
        .route("/attempts", get(attempts::list_attempts))
        // Blog
        .route("/blog", get(blog::list_articles).post(blog::create_article))
        .route(
            "/blog/:id",
            get(blog::get_article)
                .put(blog::update_article)
                .delete(blog::delete_article),
        )
        .route("/blog/:id/image", post(blog::upload_image))
        .with_state(state)
}
