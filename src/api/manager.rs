//! Manager-only endpoints: user moderation and mailing shutdown

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::{Actor, DomainError};
use crate::infrastructure::AppState;
use crate::models::user::UserDto;
use crate::services::{mailing_service, user_service};

async fn require_manager(state: &AppState, claims: &Claims) -> Result<Actor, DomainError> {
    // The stored role decides; the token's claim may be stale either way
    let actor = current_actor(state.db(), claims).await?;
    if !actor.is_manager {
        return Err(DomainError::Forbidden("Manager role required".to_string()));
    }
    Ok(actor)
}

pub async fn overview(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    let actor = require_manager(&state, &claims).await?;

    let users: Vec<UserDto> = user_service::list_users(state.db())
        .await?
        .into_iter()
        .map(UserDto::from)
        .collect();
    let mailings = mailing_service::list_mailings(state.db(), actor).await?;

    Ok(Json(json!({
        "users": users,
        "mailings": mailings
    })))
}

async fn set_active(
    state: AppState,
    claims: Claims,
    id: i32,
    is_active: bool,
) -> Result<Json<serde_json::Value>, DomainError> {
    require_manager(&state, &claims).await?;
    let user = user_service::set_active(state.db(), id, is_active).await?;
    Ok(Json(json!({ "user": UserDto::from(user) })))
}

pub async fn block_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    set_active(state, claims, id, false).await
}

pub async fn unblock_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    set_active(state, claims, id, true).await
}

pub async fn complete_mailing(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    require_manager(&state, &claims).await?;
    let mailing = mailing_service::complete_mailing(state.db(), id).await?;
    Ok(Json(json!({ "mailing": mailing })))
}
