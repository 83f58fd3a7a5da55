use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registered webhook endpoint
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "webhooks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub url: String,

    /// HMAC signing key
    pub secret: Option<String>,

    /// Subscribed event types as a JSON array
    #[sea_orm(column_type = "Text")]
    pub events: String,

    pub active: bool,

    pub retry_count: i32,

    pub timeout_seconds: i32,

    /// Custom headers as a JSON object
    #[sea_orm(column_type = "Text", nullable)]
    pub headers: Option<String>,

    /// Trigger filters as a JSON object; absent when unfiltered
    #[sea_orm(column_type = "Text", nullable)]
    pub filters: Option<String>,

    pub create_time: DateTimeWithTimeZone,

    pub create_by: i32,

    pub change_time: DateTimeWithTimeZone,

    pub change_by: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::webhook_delivery::Entity")]
    Deliveries,
}

impl Related<super::webhook_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
