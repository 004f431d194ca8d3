use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::services::mailing_service::{self, AttemptFilter};

#[derive(Debug, Deserialize)]
pub struct AttemptsQuery {
    pub mailing_id: Option<i32>,
    pub client_id: Option<i32>,
}

// Delivery log; regular users only see attempts of their own mailings
pub async fn list_attempts(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<AttemptsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;

    let filter = AttemptFilter {
        mailing_id: params.mailing_id,
        client_id: params.client_id,
        owner_id: (!actor.is_manager).then_some(actor.user_id),
    };
    let attempts = mailing_service::list_attempts(state.db(), filter).await?;

    Ok(Json(json!({
        "total": attempts.len(),
        "attempts": attempts
    })))
}
