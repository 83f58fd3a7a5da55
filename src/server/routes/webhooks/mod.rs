//! Webhook management endpoints
//!
//! Static paths are registered ahead of `/{id}` so they are never captured
//! as an id.

mod deliveries;
mod models;
mod registration;

pub use deliveries::{
    get_delivery, get_webhook_deliveries, get_webhook_stats, list_event_types, retry_delivery,
    test_webhook, trigger_event,
};
pub use models::{
    DeliveryListQuery, DeliveryListResponse, EventCatalogResponse, EventTypeInfo, ListWebhooksQuery,
    RetryDeliveryResponse, TestWebhookRequest, TestWebhookResponse, TriggerEventRequest,
    WebhookListResponse, WebhookView,
};
pub use registration::{
    create_webhook, delete_webhook, get_webhook, list_webhooks, update_webhook,
};

use actix_web::web;

/// Configure webhook routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .route("", web::post().to(create_webhook))
            .route("", web::get().to(list_webhooks))
            .route("/events", web::get().to(list_event_types))
            .route("/trigger", web::post().to(trigger_event))
            .route("/deliveries/{delivery_id}", web::get().to(get_delivery))
            .route(
                "/deliveries/{delivery_id}/retry",
                web::post().to(retry_delivery),
            )
            .route("/{id}", web::get().to(get_webhook))
            .route("/{id}", web::put().to(update_webhook))
            .route("/{id}", web::delete().to(delete_webhook))
            .route("/{id}/test", web::post().to(test_webhook))
            .route("/{id}/deliveries", web::get().to(get_webhook_deliveries))
            .route("/{id}/stats", web::get().to(get_webhook_stats)),
    );
}
