use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::{DomainError, MessageInput};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/messages",
    responses(
        (status = 200, description = "List all messages")
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let messages = state.message_repo.find_all().await?;
    Ok(Json(json!({
        "total": messages.len(),
        "messages": messages
    })))
}

pub async fn get_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let message = state
        .message_repo
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound)?;
    Ok(Json(json!({ "message": message })))
}

pub async fn create_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<MessageInput>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let message = state.message_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

pub async fn update_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<MessageInput>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let message = state.message_repo.update(id, payload).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn delete_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    state.message_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
