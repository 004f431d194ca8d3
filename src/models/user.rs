use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_MANAGER: &str = "manager";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    #[sea_orm(default_value = "user")]
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mailing::Entity")]
    Mailings,
    #[sea_orm(has_many = "super::blog_article::Entity")]
    BlogArticles,
}

impl Related<super::mailing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mailings.def()
    }
}

impl Related<super::blog_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BlogArticles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_manager(&self) -> bool {
        self.role == ROLE_MANAGER
    }
}

// DTO for API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
}

impl From<Model> for UserDto {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            role: model.role,
            is_active: model.is_active,
            email_verified: model.email_verified,
        }
    }
}
