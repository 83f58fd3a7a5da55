//! Webhook type definitions
//!
//! Domain records shared by the registry, the delivery engine and the ledger,
//! plus the request bodies accepted by the HTTP surface.

use super::filters::WebhookFilters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Store-assigned identifier for webhooks and deliveries
pub type WebhookId = i32;
pub type DeliveryId = i32;

/// A registered outbound endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub name: String,
    pub url: String,
    /// Signing key; never serialized
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub active: bool,
    pub retry_count: u32,
    pub timeout_seconds: u32,
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub filters: WebhookFilters,
    pub create_time: DateTime<Utc>,
    pub create_by: i32,
    pub change_time: DateTime<Utc>,
    pub change_by: i32,
}

impl Webhook {
    /// Signing key, if one is configured and non-empty
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_subscribed_to(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }

    /// Subscribed to `event_type` and the event data passes the filters
    pub fn should_trigger(&self, event_type: &str, data: &Map<String, Value>) -> bool {
        self.active && self.is_subscribed_to(event_type) && self.filters.matches(event_type, data)
    }
}

/// A validated webhook ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhook {
    pub name: String,
    pub url: String,
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub retry_count: u32,
    pub timeout_seconds: u32,
    pub headers: BTreeMap<String, String>,
    pub filters: WebhookFilters,
}

/// Validated partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    /// `Some(None)` removes the secret
    pub secret: Option<Option<String>>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
    pub retry_count: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub headers: Option<BTreeMap<String, String>>,
    pub filters: Option<WebhookFilters>,
}

impl WebhookChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changes to an in-memory record
    pub fn apply_to(&self, webhook: &mut Webhook) {
        if let Some(name) = &self.name {
            webhook.name = name.clone();
        }
        if let Some(url) = &self.url {
            webhook.url = url.clone();
        }
        if let Some(secret) = &self.secret {
            webhook.secret = secret.clone();
        }
        if let Some(events) = &self.events {
            webhook.events = events.clone();
        }
        if let Some(active) = self.active {
            webhook.active = active;
        }
        if let Some(retry_count) = self.retry_count {
            webhook.retry_count = retry_count;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            webhook.timeout_seconds = timeout_seconds;
        }
        if let Some(headers) = &self.headers {
            webhook.headers = headers.clone();
        }
        if let Some(filters) = &self.filters {
            webhook.filters = filters.clone();
        }
    }
}

/// Body sent to receivers: `{event, timestamp, data, signature?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
}

impl WebhookPayload {
    pub fn new(event: &str, data: Map<String, Value>) -> Self {
        Self {
            event: event.to_string(),
            timestamp: Utc::now(),
            data,
            signature: None,
        }
    }
}

/// Outcome of one outbound HTTP attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// HTTP status, or 0 when no response was received
    pub status_code: u16,
    pub response_body: String,
    pub elapsed_ms: u64,
    /// Set when the request failed before a response arrived
    pub transport_error: Option<String>,
}

impl DeliveryResult {
    pub fn success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn transport_failure<S: Into<String>>(error: S, elapsed_ms: u64) -> Self {
        Self {
            status_code: 0,
            response_body: String::new(),
            elapsed_ms,
            transport_error: Some(error.into()),
        }
    }
}

/// A persisted delivery attempt (group)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: DeliveryId,
    pub webhook_id: WebhookId,
    pub event_type: String,
    /// Exact JSON body that was transmitted
    pub payload: String,
    pub status_code: i32,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: i64,
    pub attempts: i32,
    pub success: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub next_retry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDelivery {
    /// The signature embedded in the stored body, if the original send was signed
    pub fn stored_signature(&self) -> Option<String> {
        serde_json::from_str::<WebhookPayload>(&self.payload)
            .ok()
            .and_then(|payload| payload.signature)
    }
}

/// Row to insert for a first attempt
#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub webhook_id: WebhookId,
    pub event_type: String,
    pub payload: String,
    pub status_code: i32,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: i64,
    pub success: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Outcome of a resend, written back onto the existing row
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptUpdate {
    pub status_code: i32,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: i64,
    pub success: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub next_retry: Option<DateTime<Utc>>,
}

/// Raw aggregates a store computes over one webhook's deliveries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryAggregates {
    pub total: u64,
    pub successful: u64,
    pub pending_retries: u64,
    pub average_response_time_ms: Option<f64>,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Aggregate counters for one webhook's ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub webhook_id: WebhookId,
    pub total_deliveries: u64,
    pub successful_deliveries: u64,
    pub failed_deliveries: u64,
    pub pending_retries: u64,
    pub success_rate: f64,
    /// Rounded mean over all recorded attempts; 0 without deliveries
    pub average_response_time_ms: i64,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl DeliveryStats {
    pub fn new(webhook_id: WebhookId, aggregates: DeliveryAggregates) -> Self {
        let DeliveryAggregates {
            total,
            successful,
            pending_retries,
            average_response_time_ms,
            last_delivery_at,
            last_success_at,
            last_failure_at,
        } = aggregates;

        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };
        Self {
            webhook_id,
            total_deliveries: total,
            successful_deliveries: successful,
            failed_deliveries: total.saturating_sub(successful),
            pending_retries,
            success_rate,
            average_response_time_ms: average_response_time_ms
                .map(|ms| ms.round() as i64)
                .unwrap_or_default(),
            last_delivery_at,
            last_success_at,
            last_failure_at,
        }
    }
}

/// `POST /webhooks` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterWebhookRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub secret: Option<String>,
    #[serde(default)]
    pub events: Vec<String>,
    pub retry_count: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub headers: Option<BTreeMap<String, String>>,
    pub filters: Option<WebhookFilters>,
}

/// `PUT /webhooks/{id}` body; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWebhookRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub secret: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
    pub retry_count: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub headers: Option<BTreeMap<String, String>>,
    pub filters: Option<WebhookFilters>,
}
