//! In-process store used when no database is configured
//!
//! Mirrors the database semantics: ids are assigned sequentially, listings
//! come back newest first and deleting a webhook removes its deliveries.

use crate::core::webhooks::repository::{DeliveryRepository, WebhookRepository};
use crate::core::webhooks::types::{
    AttemptUpdate, DeliveryAggregates, DeliveryId, DeliveryStats, NewDelivery, NewWebhook, Webhook,
    WebhookChanges, WebhookDelivery, WebhookId,
};
use crate::utils::error::{Result, WebhookError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryData {
    next_webhook_id: WebhookId,
    next_delivery_id: DeliveryId,
    webhooks: BTreeMap<WebhookId, Webhook>,
    deliveries: BTreeMap<DeliveryId, WebhookDelivery>,
}

/// Webhook and delivery tables kept in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<MemoryData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookRepository for InMemoryStore {
    async fn insert_webhook(&self, new_webhook: &NewWebhook, user_id: i32) -> Result<Webhook> {
        let mut data = self.data.write().await;
        data.next_webhook_id += 1;

        let now = Utc::now();
        let webhook = Webhook {
            id: data.next_webhook_id,
            name: new_webhook.name.clone(),
            url: new_webhook.url.clone(),
            secret: new_webhook.secret.clone(),
            events: new_webhook.events.clone(),
            active: true,
            retry_count: new_webhook.retry_count,
            timeout_seconds: new_webhook.timeout_seconds,
            headers: new_webhook.headers.clone(),
            filters: new_webhook.filters.clone(),
            create_time: now,
            create_by: user_id,
            change_time: now,
            change_by: user_id,
        };
        data.webhooks.insert(webhook.id, webhook.clone());
        debug!("Stored webhook {} in memory", webhook.id);
        Ok(webhook)
    }

    async fn list_webhooks(&self, active: Option<bool>) -> Result<Vec<Webhook>> {
        let data = self.data.read().await;
        Ok(data
            .webhooks
            .values()
            .rev()
            .filter(|w| active.is_none_or(|a| w.active == a))
            .cloned()
            .collect())
    }

    async fn find_webhook(&self, id: WebhookId) -> Result<Option<Webhook>> {
        Ok(self.data.read().await.webhooks.get(&id).cloned())
    }

    async fn update_webhook(
        &self,
        id: WebhookId,
        changes: &WebhookChanges,
        user_id: i32,
    ) -> Result<Option<Webhook>> {
        let mut data = self.data.write().await;
        let Some(webhook) = data.webhooks.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(webhook);
        webhook.change_time = Utc::now();
        webhook.change_by = user_id;
        Ok(Some(webhook.clone()))
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<bool> {
        // single write lock keeps the cascade atomic
        let mut data = self.data.write().await;
        if data.webhooks.remove(&id).is_none() {
            return Ok(false);
        }
        data.deliveries.retain(|_, d| d.webhook_id != id);
        Ok(true)
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryStore {
    async fn insert_delivery(&self, delivery: &NewDelivery) -> Result<WebhookDelivery> {
        let mut data = self.data.write().await;
        data.next_delivery_id += 1;

        let record = WebhookDelivery {
            id: data.next_delivery_id,
            webhook_id: delivery.webhook_id,
            event_type: delivery.event_type.clone(),
            payload: delivery.payload.clone(),
            status_code: delivery.status_code,
            response: delivery.response.clone(),
            error_message: delivery.error_message.clone(),
            response_time_ms: delivery.response_time_ms,
            attempts: 1,
            success: delivery.success,
            delivered_at: delivery.delivered_at,
            next_retry: None,
            created_at: Utc::now(),
        };
        data.deliveries.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_deliveries(
        &self,
        webhook_id: WebhookId,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>> {
        let data = self.data.read().await;
        let mut deliveries: Vec<WebhookDelivery> = data
            .deliveries
            .values()
            .filter(|d| d.webhook_id == webhook_id)
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        deliveries.truncate(limit as usize);
        Ok(deliveries)
    }

    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<WebhookDelivery>> {
        Ok(self.data.read().await.deliveries.get(&id).cloned())
    }

    async fn schedule_retry(
        &self,
        id: DeliveryId,
        at: DateTime<Utc>,
    ) -> Result<Option<WebhookDelivery>> {
        let mut data = self.data.write().await;
        let Some(delivery) = data.deliveries.get_mut(&id) else {
            return Ok(None);
        };
        delivery.attempts += 1;
        delivery.next_retry = Some(at);
        Ok(Some(delivery.clone()))
    }

    async fn due_retries(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<WebhookDelivery>> {
        let data = self.data.read().await;
        let mut due: Vec<WebhookDelivery> = data
            .deliveries
            .values()
            .filter(|d| !d.success && d.next_retry.is_some_and(|t| t <= now))
            .cloned()
            .collect();
        due.sort_by_key(|d| d.next_retry);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn record_attempt(&self, id: DeliveryId, update: &AttemptUpdate) -> Result<()> {
        let mut data = self.data.write().await;
        let delivery = data
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| WebhookError::not_found("Delivery not found"))?;

        delivery.status_code = update.status_code;
        delivery.response = update.response.clone();
        delivery.error_message = update.error_message.clone();
        delivery.response_time_ms = update.response_time_ms;
        delivery.success = update.success;
        delivery.delivered_at = update.delivered_at;
        delivery.next_retry = update.next_retry;
        Ok(())
    }

    async fn delete_deliveries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut data = self.data.write().await;
        let before = data.deliveries.len();
        data.deliveries.retain(|_, d| d.created_at >= cutoff);
        Ok((before - data.deliveries.len()) as u64)
    }

    async fn delivery_stats(&self, webhook_id: WebhookId) -> Result<DeliveryStats> {
        let data = self.data.read().await;
        let deliveries: Vec<&WebhookDelivery> = data
            .deliveries
            .values()
            .filter(|d| d.webhook_id == webhook_id)
            .collect();

        let successful = deliveries.iter().filter(|d| d.success).count() as u64;
        let pending_retries = deliveries
            .iter()
            .filter(|d| !d.success && d.next_retry.is_some())
            .count() as u64;
        let average_response_time_ms = if deliveries.is_empty() {
            None
        } else {
            let sum: i64 = deliveries.iter().map(|d| d.response_time_ms).sum();
            Some(sum as f64 / deliveries.len() as f64)
        };
        let last_where = |success: bool| {
            deliveries
                .iter()
                .filter(|d| d.success == success)
                .map(|d| d.created_at)
                .max()
        };

        Ok(DeliveryStats::new(
            webhook_id,
            DeliveryAggregates {
                total: deliveries.len() as u64,
                successful,
                pending_retries,
                average_response_time_ms,
                last_delivery_at: deliveries.iter().map(|d| d.created_at).max(),
                last_success_at: last_where(true),
                last_failure_at: last_where(false),
            },
        ))
    }
}
