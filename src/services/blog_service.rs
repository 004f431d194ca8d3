//! Blog Service - articles, view counting and cover images

use std::path::Path;

use image::ImageFormat;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::{Actor, DomainError};
use crate::models::blog_article::{self, ArticleInput, Entity as BlogArticle};

pub const MAX_TITLE_LEN: usize = 200;
pub const IMAGE_DIR: &str = "blog";

fn validate(input: &ArticleInput) -> Result<(), DomainError> {
    if input.title.trim().is_empty() {
        return Err(DomainError::Validation("title is required".to_string()));
    }
    if input.title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Newest first.
pub async fn list_articles(db: &DatabaseConnection) -> Result<Vec<blog_article::Model>, DomainError> {
    Ok(BlogArticle::find()
        .order_by_desc(blog_article::Column::PubDate)
        .order_by_desc(blog_article::Column::Id)
        .all(db)
        .await?)
}

/// Fetch an article for display, counting the read.
pub async fn get_article_and_count_view(
    db: &DatabaseConnection,
    id: i32,
) -> Result<blog_article::Model, DomainError> {
    let result = BlogArticle::update_many()
        .col_expr(
            blog_article::Column::Views,
            Expr::col(blog_article::Column::Views).add(1),
        )
        .filter(blog_article::Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }

    BlogArticle::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)
}

pub async fn create_article(
    db: &DatabaseConnection,
    author_id: i32,
    input: ArticleInput,
) -> Result<blog_article::Model, DomainError> {
    validate(&input)?;

    let article = blog_article::ActiveModel {
        author_id: Set(author_id),
        title: Set(input.title.trim().to_string()),
        content: Set(input.content),
        image: Set(None),
        views: Set(0),
        pub_date: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Published blog article {} by user {}", article.id, author_id);
    Ok(article)
}

async fn find_editable(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
) -> Result<blog_article::Model, DomainError> {
    let article = BlogArticle::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    if article.author_id != actor.user_id && !actor.is_manager {
        return Err(DomainError::Forbidden(
            "Only the author or a manager can change this article".to_string(),
        ));
    }
    Ok(article)
}

pub async fn update_article(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
    input: ArticleInput,
) -> Result<blog_article::Model, DomainError> {
    validate(&input)?;
    let article = find_editable(db, actor, id).await?;

    let mut active: blog_article::ActiveModel = article.into();
    active.title = Set(input.title.trim().to_string());
    active.content = Set(input.content);
    Ok(active.update(db).await?)
}

pub async fn delete_article(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
    media_root: &Path,
) -> Result<(), DomainError> {
    let article = find_editable(db, actor, id).await?;
    let image = article.image.clone();

    BlogArticle::delete_by_id(article.id).exec(db).await?;

    if let Some(image) = image {
        remove_image(media_root, &image).await;
    }
    Ok(())
}

async fn remove_image(media_root: &Path, relative: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        tracing::warn!("Failed to remove image {}: {}", relative, e);
    }
}

/// Store an uploaded JPEG or PNG as the article's image, replacing any
/// previous one. Returns the updated article.
pub async fn store_image(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
    media_root: &Path,
    data: &[u8],
) -> Result<blog_article::Model, DomainError> {
    let article = find_editable(db, actor, id).await?;

    let extension = match image::guess_format(data) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpg",
        _ => {
            return Err(DomainError::Validation(
                "Image must be a PNG or JPEG file".to_string(),
            ));
        }
    };

    let dir = media_root.join(IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| DomainError::Internal(format!("Cannot create {}: {}", dir.display(), e)))?;

    let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
    let stored = dir.join(&file_name);
    tokio::fs::write(&stored, data)
        .await
        .map_err(|e| DomainError::Internal(format!("Cannot store image: {}", e)))?;

    let previous = article.image.clone();
    let mut active: blog_article::ActiveModel = article.into();
    active.image = Set(Some(format!("{}/{}", IMAGE_DIR, file_name)));
    let updated = match active.update(db).await {
        Ok(updated) => updated,
        Err(e) => {
            // Nothing points at the new file
            if let Err(io) = tokio::fs::remove_file(&stored).await {
                tracing::warn!("Failed to remove orphaned image {}: {}", stored.display(), io);
            }
            return Err(e.into());
        }
    };

    if let Some(previous) = previous {
        remove_image(media_root, &previous).await;
    }

    Ok(updated)
}
