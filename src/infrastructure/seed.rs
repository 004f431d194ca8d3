use crate::auth::hash_password;
use crate::domain::DomainError;
use crate::models::user::{self, ROLE_MANAGER};
use sea_orm::*;

/// Create an active, verified manager account unless the email is taken.
/// Returns `true` when a new account was inserted.
pub async fn seed_manager(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<bool, DomainError> {
    let password_hash = hash_password(password).map_err(DomainError::Internal)?;
    let now = chrono::Utc::now().to_rfc3339();

    let manager = user::ActiveModel {
        email: Set(email.to_owned()),
        password_hash: Set(password_hash),
        full_name: Set("Manager".to_owned()),
        role: Set(ROLE_MANAGER.to_owned()),
        is_active: Set(true),
        email_verified: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let inserted = user::Entity::insert(manager)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(inserted > 0)
}
