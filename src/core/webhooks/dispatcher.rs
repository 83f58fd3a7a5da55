//! Event dispatch
//!
//! Fans an event out to every active subscriber concurrently. Ledger writes
//! run on detached tasks so the producer never waits on them.

use super::delivery::{DeliveryEngine, DeliveryOutcome};
use super::events::{Event, data_map, validate_event_type};
use super::ledger::DeliveryLedger;
use super::registry::WebhookRegistry;
use super::types::{DeliveryId, DeliveryResult, Webhook, WebhookId};
use crate::utils::error::Result;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Event type used when a test call does not name one
pub const TEST_EVENT_TYPE: &str = "test.webhook";

/// Per-webhook line of a dispatch report
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedDelivery {
    pub webhook_id: WebhookId,
    pub status_code: u16,
    pub success: bool,
    pub response_time_ms: u64,
}

/// Summary of one event fan-out
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub event_type: String,
    pub matched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub deliveries: Vec<DispatchedDelivery>,
}

/// Result of an ad hoc test delivery
#[derive(Debug, Clone)]
pub struct TestDelivery {
    pub result: DeliveryResult,
    /// Ledger row, when the caller asked for the test to be recorded
    pub delivery_id: Option<DeliveryId>,
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    registry: WebhookRegistry,
    engine: DeliveryEngine,
    ledger: DeliveryLedger,
}

impl WebhookDispatcher {
    pub fn new(registry: WebhookRegistry, engine: DeliveryEngine, ledger: DeliveryLedger) -> Self {
        Self {
            registry,
            engine,
            ledger,
        }
    }

    /// Deliver `event` to all active subscribers and wait for the HTTP calls.
    ///
    /// Individual delivery failures are reported, not returned as errors.
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchReport> {
        let subscribers = self
            .registry
            .subscribers(&event.event_type, &event.data)
            .await?;
        debug!(
            "Dispatching {} from {} (user {:?}) to {} webhooks",
            event.event_type,
            event.source,
            event.user_id,
            subscribers.len()
        );

        let deliveries = join_all(
            subscribers
                .iter()
                .map(|webhook| self.deliver_and_record(webhook, event)),
        )
        .await;

        let deliveries: Vec<DispatchedDelivery> = deliveries.into_iter().flatten().collect();
        let succeeded = deliveries.iter().filter(|d| d.success).count();
        let report = DispatchReport {
            event_type: event.event_type.clone(),
            matched: subscribers.len(),
            succeeded,
            failed: subscribers.len() - succeeded,
            deliveries,
        };

        if report.matched > 0 {
            info!(
                "Dispatched {}: {} matched, {} succeeded, {} failed",
                report.event_type, report.matched, report.succeeded, report.failed
            );
        }
        Ok(report)
    }

    /// Dispatch without making the caller wait at all
    pub fn spawn_dispatch(&self, event: Event) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(&event).await {
                error!("Failed to dispatch {}: {}", event.event_type, e);
            }
        })
    }

    async fn deliver_and_record(&self, webhook: &Webhook, event: &Event) -> Option<DispatchedDelivery> {
        let outcome = match self
            .engine
            .deliver(webhook, &event.event_type, event.data.clone())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to build payload for webhook {}: {}", webhook.id, e);
                return None;
            }
        };

        let line = DispatchedDelivery {
            webhook_id: webhook.id,
            status_code: outcome.result.status_code,
            success: outcome.result.success(),
            response_time_ms: outcome.result.elapsed_ms,
        };
        self.record_in_background(webhook, &event.event_type, outcome);
        Some(line)
    }

    /// Fire-and-forget ledger write; failures are logged only
    fn record_in_background(&self, webhook: &Webhook, event_type: &str, outcome: DeliveryOutcome) {
        let ledger = self.ledger.clone();
        let webhook_id = webhook.id;
        let retry_budget = webhook.retry_count;
        let event_type = event_type.to_string();

        tokio::spawn(async move {
            let delivery = match ledger
                .record_delivery(webhook_id, &event_type, &outcome.payload.body, &outcome.result)
                .await
            {
                Ok(delivery) => delivery,
                Err(e) => {
                    error!(
                        "Failed to record delivery of {} to webhook {}: {}",
                        event_type, webhook_id, e
                    );
                    return;
                }
            };

            if !delivery.success && retry_budget > 0 {
                if let Err(e) = ledger.retry_delivery(delivery.id).await {
                    error!("Failed to schedule retry for delivery {}: {}", delivery.id, e);
                }
            }
        });
    }

    /// Send a one-off delivery to a single webhook, active or not.
    ///
    /// Missing event type and payload default to a synthetic `test.webhook` event.
    pub async fn test_webhook(
        &self,
        webhook_id: WebhookId,
        event_type: Option<String>,
        payload: Option<Value>,
        record: bool,
    ) -> Result<TestDelivery> {
        let webhook = self.registry.get(webhook_id).await?;

        let event_type = match event_type.filter(|e| !e.trim().is_empty()) {
            Some(event_type) => {
                validate_event_type(&event_type)?;
                event_type
            }
            None => TEST_EVENT_TYPE.to_string(),
        };
        let data = match payload {
            Some(Value::Null) | None => data_map(json!({
                "message": "This is a test webhook delivery",
                "timestamp": Utc::now().to_rfc3339(),
            })),
            Some(value) => data_map(value),
        };

        let outcome = self.engine.deliver(&webhook, &event_type, data).await?;

        let delivery_id = if record {
            match self
                .ledger
                .record_delivery(webhook.id, &event_type, &outcome.payload.body, &outcome.result)
                .await
            {
                Ok(delivery) => Some(delivery.id),
                Err(e) => {
                    warn!("Failed to record test delivery for webhook {}: {}", webhook.id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(TestDelivery {
            result: outcome.result,
            delivery_id,
        })
    }
}
