use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::current_actor;
use crate::auth::Claims;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::blog_article::ArticleInput;
use crate::services::blog_service;

/// Multipart field carrying the uploaded picture
const IMAGE_FIELD: &str = "image";

pub async fn list_articles(State(state): State<AppState>) -> Result<impl IntoResponse, DomainError> {
    let articles = blog_service::list_articles(state.db()).await?;
    Ok(Json(json!({
        "total": articles.len(),
        "articles": articles
    })))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let article = blog_service::get_article_and_count_view(state.db(), id).await?;
    Ok(Json(json!({ "article": article })))
}

pub async fn create_article(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<ArticleInput>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let article = blog_service::create_article(state.db(), actor.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "article": article }))))
}

pub async fn update_article(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<ArticleInput>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    let article = blog_service::update_article(state.db(), actor, id, payload).await?;
    Ok(Json(json!({ "article": article })))
}

pub async fn delete_article(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;
    blog_service::delete_article(state.db(), actor, id, &state.config.media_root).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_image(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, DomainError> {
    let actor = current_actor(state.db(), &claims).await?;

    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::Validation(format!("Malformed upload: {}", e)))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| DomainError::Validation(format!("Malformed upload: {}", e)))?;
            data = Some(bytes);
            break;
        }
    }

    let Some(data) = data else {
        return Err(DomainError::Validation(format!(
            "Missing '{}' file field",
            IMAGE_FIELD
        )));
    };

    let article =
        blog_service::store_image(state.db(), actor, id, &state.config.media_root, &data).await?;
    Ok(Json(json!({ "article": article })))
}
