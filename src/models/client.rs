use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Client;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_attempt::Entity")]
    DeliveryAttempts,
}

impl Related<super::delivery_attempt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryAttempts.def()
    }
}

impl Related<super::mailing::Entity> for Entity {
    fn to() -> RelationDef {
        super::mailing_client::Relation::Mailing.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::mailing_client::Relation::Client.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Client {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            comment: model.comment,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
