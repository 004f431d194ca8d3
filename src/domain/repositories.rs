//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use lettre::Address;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Newsletter recipient
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating or replacing a client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInput {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub comment: String,
}

/// Repository trait for Client entity
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Find all clients, ordered by id
    async fn find_all(&self) -> Result<Vec<Client>, DomainError>;

    /// Find a client by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Client>, DomainError>;

    async fn create(&self, input: ClientInput) -> Result<Client, DomainError>;

    async fn update(&self, id: i32, input: ClientInput) -> Result<Client, DomainError>;

    /// Delete a client by ID
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Newsletter content
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i32,
    pub subject: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageInput {
    pub subject: String,
    pub body: String,
}

/// Repository trait for Message entity
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Message>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Message>, DomainError>;

    async fn create(&self, input: MessageInput) -> Result<Message, DomainError>;

    async fn update(&self, id: i32, input: MessageInput) -> Result<Message, DomainError>;

    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

pub const MAX_NAME_LEN: usize = 255;

impl ClientInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let email = self.email.trim();
        if !is_valid_email(email) {
            return Err(DomainError::Validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }
        if self.full_name.trim().is_empty() {
            return Err(DomainError::Validation("full_name is required".to_string()));
        }
        if self.full_name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "full_name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        Ok(())
    }
}

impl MessageInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.subject.trim().is_empty() {
            return Err(DomainError::Validation("subject is required".to_string()));
        }
        if self.subject.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "subject must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        Ok(())
    }
}

/// Syntax check with the same parser the SMTP transport uses, so stored
/// addresses can always be put on an envelope.
pub fn is_valid_email(value: &str) -> bool {
    value.parse::<Address>().is_ok()
}
