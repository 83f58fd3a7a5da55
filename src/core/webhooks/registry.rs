//! Webhook registry
//!
//! Validates registration and update requests and persists them through a
//! [`WebhookRepository`].

use super::events::validate_event_type;
use super::filters::WebhookFilters;
use super::repository::WebhookRepository;
use super::signing::SIGNATURE_HEADER;
use super::types::{
    NewWebhook, RegisterWebhookRequest, UpdateWebhookRequest, Webhook, WebhookChanges, WebhookId,
};
use crate::config::WebhooksConfig;
use crate::utils::error::{Result, WebhookError};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Upper bound on a webhook's retry budget
pub const MAX_RETRY_COUNT: u32 = 25;

/// Registered webhook endpoints
#[derive(Clone)]
pub struct WebhookRegistry {
    repo: Arc<dyn WebhookRepository>,
    policy: WebhooksConfig,
}

impl WebhookRegistry {
    pub fn new(repo: Arc<dyn WebhookRepository>, policy: WebhooksConfig) -> Self {
        Self { repo, policy }
    }

    /// Validate and persist a new webhook. New webhooks start active.
    pub async fn register(&self, request: RegisterWebhookRequest, user_id: i32) -> Result<Webhook> {
        let new_webhook = self.validate_registration(request)?;
        let webhook = self.repo.insert_webhook(&new_webhook, user_id).await?;
        info!(
            "Registered webhook {} ({}) for events {:?}",
            webhook.id, webhook.url, webhook.events
        );
        Ok(webhook)
    }

    pub async fn list(&self, active: Option<bool>) -> Result<Vec<Webhook>> {
        debug!("Listing webhooks, active filter: {:?}", active);
        self.repo.list_webhooks(active).await
    }

    pub async fn get(&self, id: WebhookId) -> Result<Webhook> {
        self.repo
            .find_webhook(id)
            .await?
            .ok_or_else(|| WebhookError::not_found(format!("Webhook {} not found", id)))
    }

    /// Overwrite only the supplied fields
    pub async fn update(
        &self,
        id: WebhookId,
        request: UpdateWebhookRequest,
        user_id: i32,
    ) -> Result<Webhook> {
        let changes = self.validate_update(request)?;

        // existence is checked before any write
        let current = self.get(id).await?;
        if changes.is_empty() {
            debug!("Update for webhook {} carries no changes", id);
            return Ok(current);
        }

        let webhook = self
            .repo
            .update_webhook(id, &changes, user_id)
            .await?
            .ok_or_else(|| WebhookError::not_found(format!("Webhook {} not found", id)))?;
        info!("Updated webhook {}", id);
        Ok(webhook)
    }

    /// Remove a webhook together with its delivery history
    pub async fn delete(&self, id: WebhookId) -> Result<()> {
        if !self.repo.delete_webhook(id).await? {
            return Err(WebhookError::not_found(format!("Webhook {} not found", id)));
        }
        info!("Deleted webhook {}", id);
        Ok(())
    }

    /// Active webhooks subscribed to `event_type` whose filters accept `data`
    pub async fn subscribers(
        &self,
        event_type: &str,
        data: &Map<String, Value>,
    ) -> Result<Vec<Webhook>> {
        let webhooks = self.repo.list_webhooks(Some(true)).await?;
        Ok(webhooks
            .into_iter()
            .filter(|webhook| {
                let trigger = webhook.should_trigger(event_type, data);
                if !trigger && webhook.is_subscribed_to(event_type) {
                    debug!("Webhook {} filtered out {}", webhook.id, event_type);
                }
                trigger
            })
            .collect())
    }

    fn validate_registration(&self, request: RegisterWebhookRequest) -> Result<NewWebhook> {
        let name = validate_name(&request.name)?;
        let url = validate_url(&request.url)?;
        let events = validate_events(request.events)?;

        let retry_count = match request.retry_count {
            None | Some(0) => self.policy.default_retry_count,
            Some(n) => validate_retry_count(n)?,
        };
        let timeout_seconds = match request.timeout_seconds {
            None | Some(0) => self.policy.default_timeout_seconds,
            Some(n) => self.validate_timeout(n)?,
        };
        let headers = match request.headers {
            Some(headers) => validate_headers(headers)?,
            None => BTreeMap::new(),
        };

        Ok(NewWebhook {
            name,
            url,
            secret: request.secret.filter(|s| !s.is_empty()),
            events,
            retry_count,
            timeout_seconds,
            headers,
            filters: request.filters.unwrap_or_default().validated()?,
        })
    }

    fn validate_update(&self, request: UpdateWebhookRequest) -> Result<WebhookChanges> {
        Ok(WebhookChanges {
            name: request.name.as_deref().map(validate_name).transpose()?,
            url: request.url.as_deref().map(validate_url).transpose()?,
            secret: request
                .secret
                .map(|secret| Some(secret).filter(|s| !s.is_empty())),
            events: request.events.map(validate_events).transpose()?,
            active: request.active,
            retry_count: request.retry_count.map(validate_retry_count).transpose()?,
            timeout_seconds: request
                .timeout_seconds
                .map(|n| self.validate_timeout(n))
                .transpose()?,
            headers: request.headers.map(validate_headers).transpose()?,
            filters: request.filters.map(WebhookFilters::validated).transpose()?,
        })
    }

    fn validate_timeout(&self, seconds: i64) -> Result<u32> {
        let max = self.policy.max_timeout_seconds;
        if seconds < 1 || seconds > max as i64 {
            return Err(WebhookError::validation(format!(
                "timeout_seconds must be between 1 and {}",
                max
            )));
        }
        Ok(seconds as u32)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WebhookError::validation("name is required"));
    }
    Ok(name.to_string())
}

/// Absolute http(s) URL with a host
pub fn validate_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WebhookError::validation("url is required"));
    }

    let parsed = url::Url::parse(raw)
        .map_err(|e| WebhookError::validation(format!("Invalid webhook URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WebhookError::validation(
            "Webhook URL must use http or https",
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(WebhookError::validation("Webhook URL must include a host"));
    }

    Ok(raw.to_string())
}

fn validate_events(events: Vec<String>) -> Result<Vec<String>> {
    if events.is_empty() {
        return Err(WebhookError::validation("At least one event is required"));
    }

    let mut unique: Vec<String> = Vec::with_capacity(events.len());
    for event in events {
        let event = event.trim().to_string();
        validate_event_type(&event)?;
        if !unique.contains(&event) {
            unique.push(event);
        }
    }
    Ok(unique)
}

fn validate_retry_count(count: i64) -> Result<u32> {
    if count < 0 || count > MAX_RETRY_COUNT as i64 {
        return Err(WebhookError::validation(format!(
            "retry_count must be between 0 and {}",
            MAX_RETRY_COUNT
        )));
    }
    Ok(count as u32)
}

fn validate_headers(headers: BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
    for (name, value) in &headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WebhookError::validation(format!("Invalid header name: {}", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            WebhookError::validation(format!("Invalid value for header {}", name))
        })?;
        if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            return Err(WebhookError::validation(format!(
                "{} is reserved and cannot be set as a custom header",
                SIGNATURE_HEADER
            )));
        }
    }
    Ok(headers)
}
