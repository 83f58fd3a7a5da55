//! Application state shared across HTTP handlers

use crate::auth::JwtHandler;
use crate::config::Config;
use crate::core::webhooks::{
    DeliveryEngine, DeliveryLedger, RetryWorker, WebhookDispatcher, WebhookRegistry,
};
use crate::storage::StorageLayer;
use crate::utils::error::Result;
use std::sync::Arc;

/// HTTP server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (shared read-only)
    pub config: Arc<Config>,
    /// Storage layer
    pub storage: Arc<StorageLayer>,
    /// Bearer token verification
    pub jwt: Arc<JwtHandler>,
    pub registry: WebhookRegistry,
    pub ledger: DeliveryLedger,
    pub engine: DeliveryEngine,
    pub dispatcher: WebhookDispatcher,
}

impl AppState {
    /// Wire the webhook services on top of an initialized storage layer
    pub fn new(config: Config, storage: StorageLayer) -> Result<Self> {
        let policy = config.webhooks().clone();
        let registry = WebhookRegistry::new(storage.webhooks(), policy.clone());
        let ledger = DeliveryLedger::new(storage.deliveries(), policy.clone());
        let engine = DeliveryEngine::new(&policy)?;
        let dispatcher = WebhookDispatcher::new(registry.clone(), engine.clone(), ledger.clone());
        let jwt = JwtHandler::new(config.auth());

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            jwt: Arc::new(jwt),
            registry,
            ledger,
            engine,
            dispatcher,
        })
    }

    /// Background worker sharing this state's services
    pub fn retry_worker(&self) -> RetryWorker {
        RetryWorker::new(
            self.registry.clone(),
            self.engine.clone(),
            self.ledger.clone(),
            self.config.webhooks().clone(),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
