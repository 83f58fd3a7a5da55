use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One logical delivery of an event to a webhook
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_deliveries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub webhook_id: i32,

    pub event_type: String,

    /// Transmitted JSON body
    #[sea_orm(column_type = "Text")]
    pub payload: String,

    /// HTTP status, 0 when the transport failed
    pub status_code: i32,

    /// Truncated response body
    #[sea_orm(column_type = "Text", nullable)]
    pub response: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub response_time_ms: i64,

    pub attempts: i32,

    pub success: bool,

    pub delivered_at: Option<DateTimeWithTimeZone>,

    pub next_retry: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::webhook::Entity",
        from = "Column::WebhookId",
        to = "super::webhook::Column::Id"
    )]
    Webhook,
}

impl Related<super::webhook::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Webhook.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
