//! Delivery, test, retry and dispatch endpoints

use super::models::{
    DeliveryListQuery, DeliveryListResponse, EventCatalogResponse, RetryDeliveryResponse,
    TestWebhookRequest, TestWebhookResponse, TriggerEventRequest,
};
use crate::core::webhooks::Event;
use crate::core::webhooks::events::data_map;
use crate::server::middleware::AuthenticatedUser;
use crate::server::routes::parse_id;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::{debug, info};

/// Supported event types grouped by domain
pub async fn list_event_types(_user: AuthenticatedUser) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(EventCatalogResponse::catalog()))
}

/// Send a one-off delivery and report the outcome.
///
/// Delivery failures are part of the 200 body, never an error status.
pub async fn test_webhook(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: Option<web::Json<TestWebhookRequest>>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    info!("Webhook {} test requested by user {}", id, user.user_id);

    let outcome = state
        .dispatcher
        .test_webhook(id, request.event_type, request.test_payload, request.record)
        .await?;

    Ok(HttpResponse::Ok().json(TestWebhookResponse::from_result(
        outcome.result,
        outcome.delivery_id,
    )))
}

/// Delivery history, newest first
pub async fn get_webhook_deliveries(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
    query: web::Query<DeliveryListQuery>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;

    let deliveries = state.ledger.list_deliveries(id, query.limit).await?;
    debug!("Returning {} deliveries for webhook {}", deliveries.len(), id);

    Ok(HttpResponse::Ok().json(DeliveryListResponse {
        total: deliveries.len(),
        deliveries,
    }))
}

pub async fn get_webhook_stats(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;

    // 404 for unknown webhooks rather than all-zero counters
    state.registry.get(id).await?;
    let stats = state.ledger.stats(id).await?;

    Ok(HttpResponse::Ok().json(stats))
}

pub async fn get_delivery(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "delivery")?;

    let delivery = state.ledger.get_delivery(id).await?;
    Ok(HttpResponse::Ok().json(delivery))
}

/// Queue a delivery for another attempt
pub async fn retry_delivery(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "delivery")?;

    let delivery = state.ledger.retry_delivery(id).await?;
    info!("Delivery {} retry requested by user {}", id, user.user_id);

    Ok(HttpResponse::Ok().json(RetryDeliveryResponse {
        success: true,
        message: "Webhook delivery queued for retry".to_string(),
        delivery_id: delivery.id,
        attempts: delivery.attempts,
        next_retry: delivery.next_retry,
    }))
}

/// Dispatch an event to every subscribed webhook and report per-webhook results
pub async fn trigger_event(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<TriggerEventRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();
    let event = Event::custom(&request.event_type, data_map(request.data))?
        .with_user(user.user_id)
        .with_source("api");

    let report = state.dispatcher.dispatch(&event).await?;
    Ok(HttpResponse::Ok().json(report))
}
