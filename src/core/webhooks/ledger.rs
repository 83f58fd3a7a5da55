//! Delivery ledger
//!
//! Every production delivery leaves one row here. Retries mutate that row
//! instead of adding new ones.

use super::repository::DeliveryRepository;
use super::types::{
    AttemptUpdate, DeliveryId, DeliveryResult, DeliveryStats, NewDelivery, WebhookDelivery,
    WebhookId,
};
use crate::config::WebhooksConfig;
use crate::utils::error::{Result, WebhookError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DeliveryLedger {
    repo: Arc<dyn DeliveryRepository>,
    policy: WebhooksConfig,
}

impl DeliveryLedger {
    pub fn new(repo: Arc<dyn DeliveryRepository>, policy: WebhooksConfig) -> Self {
        Self { repo, policy }
    }

    /// Record the first attempt of a delivery
    pub async fn record_delivery(
        &self,
        webhook_id: WebhookId,
        event_type: &str,
        payload: &str,
        result: &DeliveryResult,
    ) -> Result<WebhookDelivery> {
        let success = result.success();
        let delivery = NewDelivery {
            webhook_id,
            event_type: event_type.to_string(),
            payload: payload.to_string(),
            status_code: i32::from(result.status_code),
            response: non_empty(&result.response_body),
            error_message: result.transport_error.clone(),
            response_time_ms: result.elapsed_ms as i64,
            success,
            delivered_at: success.then(Utc::now),
        };

        let recorded = self.repo.insert_delivery(&delivery).await?;
        debug!(
            "Recorded delivery {} for webhook {} ({}, success={})",
            recorded.id, webhook_id, event_type, success
        );
        Ok(recorded)
    }

    /// Newest first, never more than the configured history limit
    pub async fn list_deliveries(
        &self,
        webhook_id: WebhookId,
        limit: Option<u64>,
    ) -> Result<Vec<WebhookDelivery>> {
        let cap = self.policy.delivery_history_limit;
        let limit = limit.unwrap_or(cap).clamp(1, cap);
        self.repo.list_deliveries(webhook_id, limit).await
    }

    pub async fn get_delivery(&self, id: DeliveryId) -> Result<WebhookDelivery> {
        self.repo
            .find_delivery(id)
            .await?
            .ok_or_else(|| WebhookError::not_found("Delivery not found"))
    }

    /// Mark a delivery for another attempt after the backoff.
    ///
    /// Increments `attempts` and sets `next_retry`; the resend itself is left
    /// to the retry worker.
    pub async fn retry_delivery(&self, id: DeliveryId) -> Result<WebhookDelivery> {
        self.schedule_retry_at(id, Utc::now() + self.policy.retry_backoff())
            .await
    }

    pub(crate) async fn schedule_retry_at(
        &self,
        id: DeliveryId,
        at: DateTime<Utc>,
    ) -> Result<WebhookDelivery> {
        let delivery = self
            .repo
            .schedule_retry(id, at)
            .await?
            .ok_or_else(|| WebhookError::not_found("Delivery not found"))?;
        info!(
            "Delivery {} queued for retry at {} (attempt {})",
            id, at, delivery.attempts
        );
        Ok(delivery)
    }

    pub async fn due_retries(&self, now: DateTime<Utc>) -> Result<Vec<WebhookDelivery>> {
        self.repo.due_retries(now, self.policy.retry_batch_size).await
    }

    /// Write the outcome of a resend. `next_retry` is `None` once no further attempt is planned.
    pub async fn record_attempt(
        &self,
        id: DeliveryId,
        result: &DeliveryResult,
        next_retry: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let success = result.success();
        let update = AttemptUpdate {
            status_code: i32::from(result.status_code),
            response: non_empty(&result.response_body),
            error_message: result.transport_error.clone(),
            response_time_ms: result.elapsed_ms as i64,
            success,
            delivered_at: success.then(Utc::now),
            next_retry: if success { None } else { next_retry },
        };
        self.repo.record_attempt(id, &update).await
    }

    /// Stop retrying a delivery without touching its outcome
    pub async fn park(&self, delivery: &WebhookDelivery) -> Result<()> {
        let update = AttemptUpdate {
            status_code: delivery.status_code,
            response: delivery.response.clone(),
            error_message: delivery.error_message.clone(),
            response_time_ms: delivery.response_time_ms,
            success: delivery.success,
            delivered_at: delivery.delivered_at,
            next_retry: None,
        };
        self.repo.record_attempt(delivery.id, &update).await
    }

    pub async fn stats(&self, webhook_id: WebhookId) -> Result<DeliveryStats> {
        self.repo.delivery_stats(webhook_id).await
    }

    /// Remove deliveries older than the retention window
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = now - self.policy.retention();
        let removed = self.repo.delete_deliveries_before(cutoff).await?;
        if removed > 0 {
            info!("Removed {} deliveries created before {}", removed, cutoff);
        }
        Ok(removed)
    }
}

fn non_empty(body: &str) -> Option<String> {
    (!body.is_empty()).then(|| body.to_string())
}
