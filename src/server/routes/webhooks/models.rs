//! Request and response bodies for the webhook endpoints

use crate::core::webhooks::{DeliveryResult, EventType, Webhook, WebhookDelivery, WebhookFilters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Webhook as shown to API callers; the secret is reduced to a flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookView {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    pub active: bool,
    pub retry_count: u32,
    pub timeout_seconds: u32,
    pub headers: BTreeMap<String, String>,
    pub filters: WebhookFilters,
    pub has_secret: bool,
    pub create_time: DateTime<Utc>,
    pub create_by: i32,
    pub change_time: DateTime<Utc>,
    pub change_by: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl From<Webhook> for WebhookView {
    fn from(webhook: Webhook) -> Self {
        let has_secret = webhook.signing_secret().is_some();
        Self {
            id: webhook.id,
            name: webhook.name,
            url: webhook.url,
            events: webhook.events,
            active: webhook.active,
            retry_count: webhook.retry_count,
            timeout_seconds: webhook.timeout_seconds,
            headers: webhook.headers,
            filters: webhook.filters,
            has_secret,
            create_time: webhook.create_time,
            create_by: webhook.create_by,
            change_time: webhook.change_time,
            change_by: webhook.change_by,
            message: None,
        }
    }
}

impl WebhookView {
    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListWebhooksQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookListResponse {
    pub webhooks: Vec<WebhookView>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryListQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<WebhookDelivery>,
    pub total: usize,
}

/// `POST /webhooks/{id}/test` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestWebhookRequest {
    pub event_type: Option<String>,
    pub test_payload: Option<Value>,
    /// Write the outcome to the delivery ledger
    #[serde(default)]
    pub record: bool,
}

/// Outcome of a test call. Returned with 200 even when the delivery failed.
#[derive(Debug, Serialize, Deserialize)]
pub struct TestWebhookResponse {
    pub success: bool,
    pub message: String,
    pub status_code: u16,
    pub response: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delivery_id: Option<i32>,
}

impl TestWebhookResponse {
    pub fn from_result(result: DeliveryResult, delivery_id: Option<i32>) -> Self {
        let success = result.success();
        let message = if success {
            "Webhook test successful".to_string()
        } else if result.transport_error.is_some() {
            "Webhook test failed: no response from endpoint".to_string()
        } else {
            format!("Webhook test failed with status {}", result.status_code)
        };

        Self {
            success,
            message,
            status_code: result.status_code,
            response: result.response_body,
            response_time_ms: result.elapsed_ms,
            error: result.transport_error,
            delivery_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetryDeliveryResponse {
    pub success: bool,
    pub message: String,
    pub delivery_id: i32,
    pub attempts: i32,
    pub next_retry: Option<DateTime<Utc>>,
}

/// `POST /webhooks/trigger` body
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTypeInfo {
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: String,
}

impl From<EventType> for EventTypeInfo {
    fn from(event_type: EventType) -> Self {
        Self {
            event_type: event_type.as_str().to_string(),
            description: event_type.description().to_string(),
        }
    }
}

/// Event catalog grouped by domain (`ticket`, `article`, ...)
#[derive(Debug, Serialize, Deserialize)]
pub struct EventCatalogResponse {
    pub events: BTreeMap<String, Vec<EventTypeInfo>>,
    pub total: usize,
}

impl EventCatalogResponse {
    pub fn catalog() -> Self {
        let mut events: BTreeMap<String, Vec<EventTypeInfo>> = BTreeMap::new();
        for event_type in EventType::all() {
            events
                .entry(event_type.domain().to_string())
                .or_default()
                .push(EventTypeInfo::from(*event_type));
        }
        Self {
            events,
            total: EventType::all().len(),
        }
    }
}
