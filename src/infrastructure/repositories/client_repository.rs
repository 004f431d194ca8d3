//! SeaORM implementation of ClientRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{Client, ClientInput, ClientRepository, DomainError};
use crate::models::client::{self, ActiveModel, Entity as ClientEntity};

/// SeaORM-based implementation of ClientRepository
pub struct SeaOrmClientRepository {
    db: DatabaseConnection,
}

impl SeaOrmClientRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ClientRepository for SeaOrmClientRepository {
    async fn find_all(&self) -> Result<Vec<Client>, DomainError> {
        let clients = ClientEntity::find()
            .order_by_asc(client::Column::Id)
            .all(&self.db)
            .await?;

        Ok(clients.into_iter().map(Client::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Client>, DomainError> {
        let client = ClientEntity::find_by_id(id).one(&self.db).await?;
        Ok(client.map(Client::from))
    }

    async fn create(&self, input: ClientInput) -> Result<Client, DomainError> {
        input.validate()?;
        let now = chrono::Utc::now().to_rfc3339();

        let client = ActiveModel {
            email: Set(input.email.trim().to_string()),
            full_name: Set(input.full_name.trim().to_string()),
            comment: Set(input.comment),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = client.insert(&self.db).await?;
        Ok(Client::from(result))
    }

    async fn update(&self, id: i32, input: ClientInput) -> Result<Client, DomainError> {
        input.validate()?;
        let existing = ClientEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.email = Set(input.email.trim().to_string());
        active.full_name = Set(input.full_name.trim().to_string());
        active.comment = Set(input.comment);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(Client::from(result))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = ClientEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }
}
