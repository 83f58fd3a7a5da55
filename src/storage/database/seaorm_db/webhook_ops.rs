use crate::core::webhooks::repository::WebhookRepository;
use crate::core::webhooks::filters::WebhookFilters;
use crate::core::webhooks::types::{NewWebhook, Webhook, WebhookChanges, WebhookId};
use crate::utils::error::{Result, WebhookError};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::super::entities::{self, webhook, webhook_delivery};
use super::types::SeaOrmDatabase;

fn encode_events(events: &[String]) -> Result<String> {
    Ok(serde_json::to_string(events)?)
}

fn encode_headers(headers: &BTreeMap<String, String>) -> Result<Option<String>> {
    if headers.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(headers)?))
}

fn encode_filters(filters: &WebhookFilters) -> Result<Option<String>> {
    if filters.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(filters)?))
}

/// Convert a row into the domain record; malformed JSON columns degrade to empty
pub(super) fn to_webhook(model: webhook::Model) -> Webhook {
    let events = serde_json::from_str(&model.events).unwrap_or_else(|e| {
        warn!("Webhook {} has malformed events JSON: {}", model.id, e);
        Vec::new()
    });
    let headers = model
        .headers
        .as_deref()
        .filter(|h| !h.is_empty())
        .map(|h| {
            serde_json::from_str(h).unwrap_or_else(|e| {
                warn!("Webhook {} has malformed headers JSON: {}", model.id, e);
                BTreeMap::new()
            })
        })
        .unwrap_or_default();
    let filters = model
        .filters
        .as_deref()
        .filter(|f| !f.is_empty())
        .map(|f| {
            serde_json::from_str(f).unwrap_or_else(|e| {
                warn!("Webhook {} has malformed filters JSON: {}", model.id, e);
                WebhookFilters::default()
            })
        })
        .unwrap_or_default();

    Webhook {
        id: model.id,
        name: model.name,
        url: model.url,
        secret: model.secret,
        events,
        active: model.active,
        retry_count: model.retry_count.max(0) as u32,
        timeout_seconds: model.timeout_seconds.max(0) as u32,
        headers,
        filters,
        create_time: model.create_time.with_timezone(&Utc),
        create_by: model.create_by,
        change_time: model.change_time.with_timezone(&Utc),
        change_by: model.change_by,
    }
}

#[async_trait]
impl WebhookRepository for SeaOrmDatabase {
    async fn insert_webhook(&self, new_webhook: &NewWebhook, user_id: i32) -> Result<Webhook> {
        debug!("Inserting webhook: {}", new_webhook.name);

        let now = Utc::now();
        let active_model = webhook::ActiveModel {
            id: NotSet,
            name: Set(new_webhook.name.clone()),
            url: Set(new_webhook.url.clone()),
            secret: Set(new_webhook.secret.clone()),
            events: Set(encode_events(&new_webhook.events)?),
            active: Set(true),
            retry_count: Set(new_webhook.retry_count as i32),
            timeout_seconds: Set(new_webhook.timeout_seconds as i32),
            headers: Set(encode_headers(&new_webhook.headers)?),
            filters: Set(encode_filters(&new_webhook.filters)?),
            create_time: Set(now.into()),
            create_by: Set(user_id),
            change_time: Set(now.into()),
            change_by: Set(user_id),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(to_webhook(model))
    }

    async fn list_webhooks(&self, active: Option<bool>) -> Result<Vec<Webhook>> {
        debug!("Listing webhooks, active: {:?}", active);

        let mut query = entities::Webhook::find();
        if let Some(active) = active {
            query = query.filter(webhook::Column::Active.eq(active));
        }

        let models = query
            .order_by_desc(webhook::Column::Id)
            .all(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(models.into_iter().map(to_webhook).collect())
    }

    async fn find_webhook(&self, id: WebhookId) -> Result<Option<Webhook>> {
        debug!("Finding webhook by ID: {}", id);

        let model = entities::Webhook::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(model.map(to_webhook))
    }

    async fn update_webhook(
        &self,
        id: WebhookId,
        changes: &WebhookChanges,
        user_id: i32,
    ) -> Result<Option<Webhook>> {
        debug!("Updating webhook: {}", id);

        let Some(model) = entities::Webhook::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(WebhookError::Database)?
        else {
            return Ok(None);
        };

        let mut active_model: webhook::ActiveModel = model.into();
        if let Some(name) = &changes.name {
            active_model.name = Set(name.clone());
        }
        if let Some(url) = &changes.url {
            active_model.url = Set(url.clone());
        }
        if let Some(secret) = &changes.secret {
            active_model.secret = Set(secret.clone());
        }
        if let Some(events) = &changes.events {
            active_model.events = Set(encode_events(events)?);
        }
        if let Some(active) = changes.active {
            active_model.active = Set(active);
        }
        if let Some(retry_count) = changes.retry_count {
            active_model.retry_count = Set(retry_count as i32);
        }
        if let Some(timeout_seconds) = changes.timeout_seconds {
            active_model.timeout_seconds = Set(timeout_seconds as i32);
        }
        if let Some(headers) = &changes.headers {
            active_model.headers = Set(encode_headers(headers)?);
        }
        if let Some(filters) = &changes.filters {
            active_model.filters = Set(encode_filters(filters)?);
        }
        active_model.change_time = Set(Utc::now().into());
        active_model.change_by = Set(user_id);

        let model = active_model
            .update(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(Some(to_webhook(model)))
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<bool> {
        debug!("Deleting webhook and its deliveries: {}", id);

        let txn = self.db.begin().await.map_err(WebhookError::Database)?;

        entities::WebhookDelivery::delete_many()
            .filter(webhook_delivery::Column::WebhookId.eq(id))
            .exec(&txn)
            .await
            .map_err(WebhookError::Database)?;

        let result = entities::Webhook::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(WebhookError::Database)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(WebhookError::Database)?;
            return Ok(false);
        }

        txn.commit().await.map_err(WebhookError::Database)?;
        Ok(true)
    }
}
