//! Outbound webhook subsystem
//!
//! Event catalog, registry, signed delivery, the delivery ledger and the
//! background retry worker.

pub mod delivery;
pub mod dispatcher;
pub mod events;
pub mod filters;
pub mod ledger;
pub mod registry;
pub mod repository;
pub mod retry_worker;
pub mod signing;
pub mod types;

pub use delivery::{DeliveryEngine, DeliveryOutcome, SignedPayload};
pub use dispatcher::{DispatchReport, TestDelivery, WebhookDispatcher};
pub use events::{Event, EventType, validate_event_type};
pub use filters::WebhookFilters;
pub use ledger::DeliveryLedger;
pub use registry::WebhookRegistry;
pub use repository::{DeliveryRepository, WebhookRepository};
pub use retry_worker::{RetryRunReport, RetryWorker};
pub use signing::{SIGNATURE_HEADER, sign, verify};
pub use types::{
    DeliveryResult, DeliveryStats, RegisterWebhookRequest, UpdateWebhookRequest, Webhook,
    WebhookDelivery, WebhookPayload,
};
