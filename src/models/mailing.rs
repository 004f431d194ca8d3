use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Frequency, MailingStatus, StartTime};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mailings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub start_time: String, // "HH:00"
    pub frequency: String,
    #[sea_orm(default_value = "created")]
    pub status: String,
    pub user_id: i32,
    pub message_id: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::message::Entity",
        from = "Column::MessageId",
        to = "super::message::Column::Id",
        on_delete = "Cascade"
    )]
    Message,
    #[sea_orm(has_many = "super::delivery_attempt::Entity")]
    DeliveryAttempts,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::delivery_attempt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryAttempts.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        super::mailing_client::Relation::Client.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::mailing_client::Relation::Mailing.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn parsed_status(&self) -> Result<MailingStatus, DomainError> {
        self.status.parse()
    }

    pub fn parsed_start_time(&self) -> Result<StartTime, DomainError> {
        self.start_time.parse()
    }
}

// DTO for API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct MailingDto {
    pub id: i32,
    pub start_time: String,
    pub frequency: String,
    pub status: String,
    pub user_id: i32,
    pub message_id: Option<i32>,
    pub client_ids: Vec<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl MailingDto {
    pub fn new(model: Model, client_ids: Vec<i32>) -> Self {
        Self {
            id: model.id,
            start_time: model.start_time,
            frequency: model.frequency,
            status: model.status,
            user_id: model.user_id,
            message_id: model.message_id,
            client_ids,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Validated mailing fields, as accepted by create and update
#[derive(Debug, Clone, Deserialize)]
pub struct MailingInput {
    pub start_time: StartTime,
    pub frequency: Frequency,
    pub message_id: Option<i32>,
    #[serde(default)]
    pub client_ids: Vec<i32>,
}
