use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::{DomainError, Frequency, StartTime};
use crate::infrastructure::AppState;
use crate::models::mailing::MailingInput;
use crate::services::mailing_service;

fn local_time() -> chrono::NaiveTime {
    chrono::Local::now().time()
}

// Allowed values for the mailing form
pub async fn mailing_options() -> impl IntoResponse {
    let start_times: Vec<String> = StartTime::choices().map(|t| t.to_string()).collect();
    let frequencies: Vec<_> = Frequency::ALL
        .iter()
        .map(|f| json!({ "value": f.as_str(), "label": f.label() }))
        .collect();

    Json(json!({
        "start_times": start_times,
        "frequencies": frequencies
    }))
}

#[utoipa::path(
    get,
    path = "/api/mailings",
    responses(
        (status = 200, description = "Mailings visible to the caller")
    )
)]
pub async fn list_mailings(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let mailings = mailing_service::list_mailings(state.db(), actor).await?;
    Ok(Json(json!({
        "total": mailings.len(),
        "mailings": mailings
    })))
}

pub async fn get_mailing(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let mailing = mailing_service::get_mailing(state.db(), actor, id).await?;
    Ok(Json(json!({ "mailing": mailing })))
}

/// Saving a mailing whose start hour has passed dispatches it right away;
/// the response then carries the dispatch report.
#[utoipa::path(
    post,
    path = "/api/mailings",
    responses(
        (status = 201, description = "Mailing created, possibly dispatched"),
        (status = 400, description = "Unknown message or client")
    )
)]
pub async fn create_mailing(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<MailingInput>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let saved = mailing_service::save_mailing(
        state.db(),
        state.mailer.as_ref(),
        &state.templates,
        actor,
        None,
        payload,
        local_time(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_mailing(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<MailingInput>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let saved = mailing_service::save_mailing(
        state.db(),
        state.mailer.as_ref(),
        &state.templates,
        actor,
        Some(id),
        payload,
        local_time(),
    )
    .await?;
    Ok(Json(saved))
}

pub async fn delete_mailing(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    mailing_service::delete_mailing(state.db(), actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_mailing_attempts(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let attempts = mailing_service::attempts_for_mailing(state.db(), actor, id).await?;
    Ok(Json(json!({
        "total": attempts.len(),
        "attempts": attempts
    })))
}
