//! User Service - registration, activation, login and account management

use sea_orm::*;
use serde::Deserialize;

use crate::auth::{generate_password, generate_token, hash_password, verify_password};
use crate::config::Config;
use crate::domain::{DomainError, is_valid_email};
use crate::mail::{Email, Mailer, Templates};
use crate::models::user::{self, Entity as User, ROLE_USER};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileInput {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, DomainError> {
    Ok(User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

async fn find_by_token(db: &DatabaseConnection, token: &str) -> Result<user::Model, DomainError> {
    User::find()
        .filter(user::Column::VerificationToken.eq(token))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)
}

/// Create an inactive account and email its verification / activation links.
pub async fn register(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    templates: &Templates,
    config: &Config,
    input: RegisterInput,
) -> Result<user::Model, DomainError> {
    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(DomainError::Validation(format!(
            "'{}' is not a valid email address",
            input.email
        )));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(DomainError::Conflict(format!(
            "A user with email {} already exists",
            email
        )));
    }

    let password_hash = hash_password(&input.password).map_err(DomainError::Internal)?;
    let token = generate_token();
    let now = chrono::Utc::now().to_rfc3339();

    let created = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        full_name: Set(input.full_name.trim().to_string()),
        phone: Set(input.phone),
        role: Set(ROLE_USER.to_string()),
        is_active: Set(false),
        email_verified: Set(false),
        verification_token: Set(Some(token.clone())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let body = templates.render_verification(
        &created.full_name,
        &config.link(&format!("/api/users/verify_email/{}", token)),
        &config.link(&format!("/api/users/activate/{}", token)),
    )?;
    let email_msg = Email::plain(&created.email, "Confirm your registration", body)?;

    if let Err(e) = mailer.send(&email_msg).await {
        // Without the link the account could never be activated
        tracing::error!("Verification mail to {} failed: {}", created.email, e);
        User::delete_by_id(created.id).exec(db).await?;
        return Err(e.into());
    }

    tracing::info!("Registered user {} (id {})", created.email, created.id);
    Ok(created)
}

/// Confirm the address behind a verification token.
pub async fn verify_email(db: &DatabaseConnection, token: &str) -> Result<user::Model, DomainError> {
    let found = find_by_token(db, token).await?;
    if found.email_verified {
        return Ok(found);
    }

    let mut active: user::ActiveModel = found.into();
    active.email_verified = Set(true);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(db).await?)
}

/// Activate the account behind a token. The token is single-use.
pub async fn activate(db: &DatabaseConnection, token: &str) -> Result<user::Model, DomainError> {
    let found = find_by_token(db, token).await?;

    let mut active: user::ActiveModel = found.into();
    active.is_active = Set(true);
    active.email_verified = Set(true);
    active.verification_token = Set(None);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    let updated = active.update(db).await?;

    tracing::info!("Activated user {} (id {})", updated.email, updated.id);
    Ok(updated)
}

pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model, DomainError> {
    let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());

    let Some(found) = find_by_email(db, email).await? else {
        tracing::warn!("User not found: {}", email);
        return Err(invalid());
    };

    match verify_password(password, &found.password_hash) {
        Ok(true) => {}
        _ => {
            tracing::warn!("Password verification failed for user: {}", found.email);
            return Err(invalid());
        }
    }

    if !found.is_active {
        tracing::warn!("Login refused for inactive user: {}", found.email);
        return Err(DomainError::Forbidden("Account is not active".to_string()));
    }

    Ok(found)
}

/// Replace the password of the account with `email` by a generated one and
/// mail it. Unknown addresses succeed silently.
pub async fn reset_password(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    templates: &Templates,
    email: &str,
) -> Result<(), DomainError> {
    let Some(found) = find_by_email(db, email).await? else {
        tracing::info!("Password reset requested for unknown email {}", email);
        return Ok(());
    };

    let password = generate_password();
    let password_hash = hash_password(&password).map_err(DomainError::Internal)?;
    let body = templates.render_password_reset(&found.email, &password)?;
    let email_msg = Email::plain(&found.email, "Your new password", body)?;

    // Store the new hash only once the mail is out; a failed send keeps the old password
    mailer.send(&email_msg).await?;

    let user_id = found.id;
    let mut active: user::ActiveModel = found.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(db).await?;

    tracing::info!("Password reset for user {}", user_id);
    Ok(())
}

pub async fn get_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, DomainError> {
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i32,
    input: ProfileInput,
) -> Result<user::Model, DomainError> {
    if input.full_name.chars().count() > crate::domain::MAX_NAME_LEN {
        return Err(DomainError::Validation("full_name is too long".to_string()));
    }
    let found = get_user(db, user_id).await?;

    let mut active: user::ActiveModel = found.into();
    active.full_name = Set(input.full_name.trim().to_string());
    active.phone = Set(input.phone.filter(|p| !p.trim().is_empty()));
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(db).await?)
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DomainError> {
    Ok(User::find().order_by_asc(user::Column::Id).all(db).await?)
}

/// Manager action: block (`false`) or unblock (`true`) a regular user.
pub async fn set_active(
    db: &DatabaseConnection,
    user_id: i32,
    is_active: bool,
) -> Result<user::Model, DomainError> {
    let found = get_user(db, user_id).await?;
    if found.is_manager() {
        return Err(DomainError::Forbidden(
            "Managers cannot be blocked".to_string(),
        ));
    }

    let mut active: user::ActiveModel = found.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    let updated = active.update(db).await?;

    tracing::info!(
        "User {} {}",
        updated.id,
        if is_active { "unblocked" } else { "blocked" }
    );
    Ok(updated)
}
