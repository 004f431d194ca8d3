//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use std::fmt;

use crate::mail::MailError;

#[derive(Debug)]
pub enum DomainError {
    /// Resource not found
    NotFound,
    /// Validation error with message
    Validation(String),
    /// Missing or bad credentials
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Uniqueness violation (e.g. email already registered)
    Conflict(String),
    /// Database/persistence error
    Database(String),
    /// Mail transport or template error
    Mail(String),
    /// Generic internal error
    Internal(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound => write!(f, "Resource not found"),
            DomainError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DomainError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            DomainError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
            DomainError::Mail(msg) => write!(f, "Mail error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<MailError> for DomainError {
    fn from(e: MailError) -> Self {
        DomainError::Mail(e.to_string())
    }
}
