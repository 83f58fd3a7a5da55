//! Storage layer for the webhook service
//!
//! Selects the sea-orm database or the in-memory store from configuration and
//! hands both repository seams to the services.

/// Database storage module
pub mod database;
/// In-memory storage module
pub mod memory;

use crate::config::StorageConfig;
use crate::core::webhooks::repository::{DeliveryRepository, WebhookRepository};
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Concrete backend behind the repositories
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Database(Arc<database::Database>),
    Memory(Arc<memory::InMemoryStore>),
}

/// Main storage layer
#[derive(Debug, Clone)]
pub struct StorageLayer {
    backend: StorageBackend,
}

impl StorageLayer {
    /// Connect (and migrate) the configured backend
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("Initializing storage layer");

        let backend = if config.database.enabled {
            let database = database::Database::new(&config.database).await?;
            database.migrate().await?;
            StorageBackend::Database(Arc::new(database))
        } else {
            warn!("Database disabled, webhooks and deliveries are kept in memory only");
            StorageBackend::Memory(Arc::new(memory::InMemoryStore::new()))
        };

        info!("Storage layer initialized successfully");
        Ok(Self { backend })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: StorageBackend::Memory(Arc::new(memory::InMemoryStore::new())),
        }
    }

    pub fn from_database(database: database::Database) -> Self {
        Self {
            backend: StorageBackend::Database(Arc::new(database)),
        }
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub fn webhooks(&self) -> Arc<dyn WebhookRepository> {
        match &self.backend {
            StorageBackend::Database(db) => db.clone() as Arc<dyn WebhookRepository>,
            StorageBackend::Memory(store) => store.clone() as Arc<dyn WebhookRepository>,
        }
    }

    pub fn deliveries(&self) -> Arc<dyn DeliveryRepository> {
        match &self.backend {
            StorageBackend::Database(db) => db.clone() as Arc<dyn DeliveryRepository>,
            StorageBackend::Memory(store) => store.clone() as Arc<dyn DeliveryRepository>,
        }
    }

    /// Health check for the active backend
    pub async fn health_check(&self) -> Result<()> {
        match &self.backend {
            StorageBackend::Database(db) => db.health_check().await,
            StorageBackend::Memory(_) => Ok(()),
        }
    }
}
