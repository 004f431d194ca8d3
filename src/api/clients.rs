use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::{ClientInput, DomainError};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/clients",
    responses(
        (status = 200, description = "List all clients"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_clients(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let clients = state.client_repo.find_all().await?;
    Ok(Json(json!({
        "total": clients.len(),
        "clients": clients
    })))
}

pub async fn get_client(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let client = state
        .client_repo
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound)?;
    Ok(Json(json!({ "client": client })))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    responses(
        (status = 201, description = "Client created"),
        (status = 400, description = "Invalid email or name")
    )
)]
pub async fn create_client(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<ClientInput>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let client = state.client_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "client": client }))))
}

pub async fn update_client(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ClientInput>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    let client = state.client_repo.update(id, payload).await?;
    Ok(Json(json!({ "client": client })))
}

pub async fn delete_client(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    current_actor(state.db(), &claims).await?;
    state.client_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
