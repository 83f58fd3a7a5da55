use crate::core::webhooks::repository::DeliveryRepository;
use crate::core::webhooks::types::{
    AttemptUpdate, DeliveryAggregates, DeliveryId, DeliveryStats, NewDelivery, WebhookDelivery,
    WebhookId,
};
use crate::utils::error::{Result, WebhookError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::*;
use tracing::debug;

use super::super::entities::{self, webhook_delivery};
use super::types::SeaOrmDatabase;

fn to_delivery(model: webhook_delivery::Model) -> WebhookDelivery {
    WebhookDelivery {
        id: model.id,
        webhook_id: model.webhook_id,
        event_type: model.event_type,
        payload: model.payload,
        status_code: model.status_code,
        response: model.response,
        error_message: model.error_message,
        response_time_ms: model.response_time_ms,
        attempts: model.attempts,
        success: model.success,
        delivered_at: model.delivered_at.map(|t| t.with_timezone(&Utc)),
        next_retry: model.next_retry.map(|t| t.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn to_db_time(time: DateTime<Utc>) -> DateTimeWithTimeZone {
    time.into()
}

#[async_trait]
impl DeliveryRepository for SeaOrmDatabase {
    async fn insert_delivery(&self, delivery: &NewDelivery) -> Result<WebhookDelivery> {
        debug!(
            "Recording delivery of {} to webhook {}",
            delivery.event_type, delivery.webhook_id
        );

        let active_model = webhook_delivery::ActiveModel {
            id: NotSet,
            webhook_id: Set(delivery.webhook_id),
            event_type: Set(delivery.event_type.clone()),
            payload: Set(delivery.payload.clone()),
            status_code: Set(delivery.status_code),
            response: Set(delivery.response.clone()),
            error_message: Set(delivery.error_message.clone()),
            response_time_ms: Set(delivery.response_time_ms),
            attempts: Set(1),
            success: Set(delivery.success),
            delivered_at: Set(delivery.delivered_at.map(to_db_time)),
            next_retry: Set(None),
            created_at: Set(to_db_time(Utc::now())),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(to_delivery(model))
    }

    async fn list_deliveries(
        &self,
        webhook_id: WebhookId,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>> {
        debug!("Listing deliveries for webhook {} (limit {})", webhook_id, limit);

        let models = entities::WebhookDelivery::find()
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
            .order_by_desc(webhook_delivery::Column::CreatedAt)
            .order_by_desc(webhook_delivery::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(models.into_iter().map(to_delivery).collect())
    }

    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<WebhookDelivery>> {
        debug!("Finding delivery by ID: {}", id);

        let model = entities::WebhookDelivery::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(model.map(to_delivery))
    }

    async fn schedule_retry(
        &self,
        id: DeliveryId,
        at: DateTime<Utc>,
    ) -> Result<Option<WebhookDelivery>> {
        debug!("Scheduling retry of delivery {} at {}", id, at);

        let result = entities::WebhookDelivery::update_many()
            .col_expr(
                webhook_delivery::Column::Attempts,
                Expr::col(webhook_delivery::Column::Attempts).add(1),
            )
            .col_expr(
                webhook_delivery::Column::NextRetry,
                Expr::value(to_db_time(at)),
            )
            .filter(webhook_delivery::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_delivery(id).await
    }

    async fn due_retries(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<WebhookDelivery>> {
        let models = entities::WebhookDelivery::find()
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::NextRetry.is_not_null())
            .filter(webhook_delivery::Column::NextRetry.lte(to_db_time(now)))
            .order_by_asc(webhook_delivery::Column::NextRetry)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(models.into_iter().map(to_delivery).collect())
    }

    async fn record_attempt(&self, id: DeliveryId, update: &AttemptUpdate) -> Result<()> {
        debug!("Recording attempt outcome for delivery {}", id);

        let changes = webhook_delivery::ActiveModel {
            status_code: Set(update.status_code),
            response: Set(update.response.clone()),
            error_message: Set(update.error_message.clone()),
            response_time_ms: Set(update.response_time_ms),
            success: Set(update.success),
            delivered_at: Set(update.delivered_at.map(to_db_time)),
            next_retry: Set(update.next_retry.map(to_db_time)),
            ..Default::default()
        };

        let result = entities::WebhookDelivery::update_many()
            .set(changes)
            .filter(webhook_delivery::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        if result.rows_affected == 0 {
            return Err(WebhookError::not_found("Delivery not found"));
        }
        Ok(())
    }

    async fn delete_deliveries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = entities::WebhookDelivery::delete_many()
            .filter(webhook_delivery::Column::CreatedAt.lt(to_db_time(cutoff)))
            .exec(&self.db)
            .await
            .map_err(WebhookError::Database)?;

        Ok(result.rows_affected)
    }

    async fn delivery_stats(&self, webhook_id: WebhookId) -> Result<DeliveryStats> {
        let for_webhook = || {
            entities::WebhookDelivery::find()
                .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
        };

        let total = for_webhook()
            .count(&self.db)
            .await
            .map_err(WebhookError::Database)?;
        let successful = for_webhook()
            .filter(webhook_delivery::Column::Success.eq(true))
            .count(&self.db)
            .await
            .map_err(WebhookError::Database)?;
        let pending_retries = for_webhook()
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::NextRetry.is_not_null())
            .count(&self.db)
            .await
            .map_err(WebhookError::Database)?;
        let average_response_time_ms = for_webhook()
            .select_only()
            .column_as(
                SimpleExpr::from(Func::cast_as(
                    Func::avg(Expr::col(webhook_delivery::Column::ResponseTimeMs)),
                    Alias::new("DOUBLE PRECISION"),
                )),
                "average",
            )
            .into_tuple::<Option<f64>>()
            .one(&self.db)
            .await
            .map_err(WebhookError::Database)?
            .flatten();

        let latest = |success: Option<bool>| {
            let mut query = for_webhook();
            if let Some(success) = success {
                query = query.filter(webhook_delivery::Column::Success.eq(success));
            }
            query
                .order_by_desc(webhook_delivery::Column::CreatedAt)
                .one(&self.db)
        };
        let created = |model: Option<webhook_delivery::Model>| {
            model.map(|m| m.created_at.with_timezone(&Utc))
        };

        let last_delivery = latest(None).await.map_err(WebhookError::Database)?;
        let last_success = latest(Some(true)).await.map_err(WebhookError::Database)?;
        let last_failure = latest(Some(false)).await.map_err(WebhookError::Database)?;

        Ok(DeliveryStats::new(
            webhook_id,
            DeliveryAggregates {
                total,
                successful,
                pending_retries,
                average_response_time_ms,
                last_delivery_at: created(last_delivery),
                last_success_at: created(last_success),
                last_failure_at: created(last_failure),
            },
        ))
    }
}
