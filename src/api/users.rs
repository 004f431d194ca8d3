use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::current_actor;
use crate::auth::{create_jwt, Claims};
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::user::UserDto;
use crate::services::user_service::{self, ProfileInput, RegisterInput};

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, DomainError> {
    tracing::info!("Registration attempt for {}", payload.email);

    let user = user_service::register(
        state.db(),
        state.mailer.as_ref(),
        &state.templates,
        &state.config,
        payload,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": UserDto::from(user),
            "message": "Check your inbox to activate your account"
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, DomainError> {
    tracing::info!("Login attempt for user: {}", payload.email);

    let user = user_service::authenticate(state.db(), &payload.email, &payload.password).await?;
    let token = create_jwt(user.id, &user.role).map_err(DomainError::Internal)?;

    Ok(Json(json!({
        "token": token,
        "user": UserDto::from(user)
    })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    let user = user_service::verify_email(state.db(), &token).await?;
    Ok(Json(json!({
        "message": "Email address confirmed",
        "user": UserDto::from(user)
    })))
}

pub async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    let user = user_service::activate(state.db(), &token).await?;
    Ok(Json(json!({
        "message": "Account activated",
        "user": UserDto::from(user)
    })))
}

pub async fn password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, DomainError> {
    user_service::reset_password(
        state.db(),
        state.mailer.as_ref(),
        &state.templates,
        &payload.email,
    )
    .await?;

    // Same answer whether or not the address is known
    Ok(Json(json!({
        "message": "If the address is registered, a new password has been sent"
    })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let user = user_service::get_user(state.db(), actor.user_id).await?;
    Ok(Json(json!({ "user": UserDto::from(user) })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<ProfileInput>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let user = user_service::update_profile(state.db(), actor.user_id, payload).await?;
    Ok(Json(json!({ "user": UserDto::from(user) })))
}
