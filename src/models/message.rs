use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Message;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mailing::Entity")]
    Mailings,
    #[sea_orm(has_many = "super::delivery_attempt::Entity")]
    DeliveryAttempts,
}

impl Related<super::mailing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mailings.def()
    }
}

impl Related<super::delivery_attempt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryAttempts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Message {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            subject: model.subject,
            body: model.body,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
