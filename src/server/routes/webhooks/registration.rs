//! Webhook CRUD endpoints

use super::models::{ListWebhooksQuery, WebhookListResponse, WebhookView};
use crate::core::webhooks::{RegisterWebhookRequest, UpdateWebhookRequest};
use crate::server::middleware::AuthenticatedUser;
use crate::server::routes::parse_id;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde_json::json;
use tracing::{debug, info};

/// Register a new webhook
pub async fn create_webhook(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<RegisterWebhookRequest>,
) -> ActixResult<HttpResponse> {
    info!("Webhook registration by user {}", user.user_id);

    let webhook = state
        .registry
        .register(request.into_inner(), user.user_id)
        .await?;

    Ok(HttpResponse::Created().json(WebhookView::from(webhook)))
}

/// List webhooks, optionally filtered by `?active=`
pub async fn list_webhooks(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<ListWebhooksQuery>,
) -> ActixResult<HttpResponse> {
    let webhooks: Vec<WebhookView> = state
        .registry
        .list(query.active)
        .await?
        .into_iter()
        .map(WebhookView::from)
        .collect();

    Ok(HttpResponse::Ok().json(WebhookListResponse {
        total: webhooks.len(),
        webhooks,
    }))
}

pub async fn get_webhook(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;
    debug!("Get webhook {}", id);

    let webhook = state.registry.get(id).await?;
    Ok(HttpResponse::Ok().json(WebhookView::from(webhook)))
}

/// Partial update; absent fields are left alone
pub async fn update_webhook(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<UpdateWebhookRequest>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;

    let webhook = state
        .registry
        .update(id, request.into_inner(), user.user_id)
        .await?;

    Ok(HttpResponse::Ok()
        .json(WebhookView::from(webhook).with_message("Webhook updated successfully")))
}

/// Delete a webhook and its delivery history
pub async fn delete_webhook(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&path, "webhook")?;

    state.registry.delete(id).await?;
    info!("Webhook {} deleted by user {}", id, user.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Webhook deleted successfully",
        "id": id,
    })))
}
