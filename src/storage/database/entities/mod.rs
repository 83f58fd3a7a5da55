/// Webhook entity module
pub mod webhook;
/// Webhook delivery entity module
pub mod webhook_delivery;

pub use webhook::Entity as Webhook;
pub use webhook_delivery::Entity as WebhookDelivery;
