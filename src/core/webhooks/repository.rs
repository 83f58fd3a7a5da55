//! Persistence seams for the registry and the ledger
//!
//! Both traits are implemented by the sea-orm database and by the in-memory
//! store; the services above them never see SQL dialects.

use super::types::{
    AttemptUpdate, DeliveryId, DeliveryStats, NewDelivery, NewWebhook, Webhook, WebhookChanges,
    WebhookDelivery, WebhookId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// Insert a webhook with `active = true` and return it with its new id
    async fn insert_webhook(&self, webhook: &NewWebhook, user_id: i32) -> Result<Webhook>;

    /// All webhooks, newest id first, optionally filtered on `active`
    async fn list_webhooks(&self, active: Option<bool>) -> Result<Vec<Webhook>>;

    async fn find_webhook(&self, id: WebhookId) -> Result<Option<Webhook>>;

    /// Apply `changes`; `None` when the webhook does not exist
    async fn update_webhook(
        &self,
        id: WebhookId,
        changes: &WebhookChanges,
        user_id: i32,
    ) -> Result<Option<Webhook>>;

    /// Atomically remove the webhook and its deliveries; `false` when it did not exist
    async fn delete_webhook(&self, id: WebhookId) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Insert a first-attempt row (`attempts = 1`)
    async fn insert_delivery(&self, delivery: &NewDelivery) -> Result<WebhookDelivery>;

    /// Newest first, at most `limit` rows
    async fn list_deliveries(
        &self,
        webhook_id: WebhookId,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>>;

    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<WebhookDelivery>>;

    /// `attempts = attempts + 1, next_retry = at`; `None` when the delivery does not exist
    async fn schedule_retry(
        &self,
        id: DeliveryId,
        at: DateTime<Utc>,
    ) -> Result<Option<WebhookDelivery>>;

    /// Unsuccessful deliveries whose `next_retry` is at or before `now`, oldest due first
    async fn due_retries(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<WebhookDelivery>>;

    /// Write the outcome of a resend onto an existing row
    async fn record_attempt(&self, id: DeliveryId, update: &AttemptUpdate) -> Result<()>;

    /// Remove deliveries created before `cutoff`, returning how many were removed
    async fn delete_deliveries_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn delivery_stats(&self, webhook_id: WebhookId) -> Result<DeliveryStats>;
}
