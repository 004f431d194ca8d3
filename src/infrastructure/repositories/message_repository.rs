//! SeaORM implementation of MessageRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::domain::{DomainError, Message, MessageInput, MessageRepository};
use crate::models::message::{self, ActiveModel, Entity as MessageEntity};

pub struct SeaOrmMessageRepository {
    db: DatabaseConnection,
}

impl SeaOrmMessageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for SeaOrmMessageRepository {
    async fn find_all(&self) -> Result<Vec<Message>, DomainError> {
        let messages = MessageEntity::find()
            .order_by_desc(message::Column::Id)
            .all(&self.db)
            .await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Message>, DomainError> {
        let message = MessageEntity::find_by_id(id).one(&self.db).await?;
        Ok(message.map(Message::from))
    }

    async fn create(&self, input: MessageInput) -> Result<Message, DomainError> {
        input.validate()?;
        let now = chrono::Utc::now().to_rfc3339();

        let message = ActiveModel {
            subject: Set(input.subject),
            body: Set(input.body),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(Message::from(message.insert(&self.db).await?))
    }

    async fn update(&self, id: i32, input: MessageInput) -> Result<Message, DomainError> {
        input.validate()?;
        let existing = MessageEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.subject = Set(input.subject);
        active.body = Set(input.body);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(Message::from(active.update(&self.db).await?))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = MessageEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }
}
