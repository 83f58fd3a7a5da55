//! Test database utilities
//!
//! Each test gets an isolated, migrated in-memory SQLite database.

use helpdesk_webhooks::config::DatabaseConfig;
use helpdesk_webhooks::storage::StorageLayer;
use helpdesk_webhooks::storage::database::Database;
use sea_orm::ConnectionTrait;

/// Test database wrapper providing isolated in-memory SQLite instances
#[derive(Debug, Clone)]
pub struct TestDatabase {
    inner: Database,
}

impl TestDatabase {
    /// Create and migrate a new in-memory database
    pub async fn new() -> Self {
        let db = Database::new(&test_db_config())
            .await
            .expect("Failed to create in-memory test database");

        db.migrate()
            .await
            .expect("Failed to run database migrations");

        Self { inner: db }
    }

    /// Get reference to the underlying database
    pub fn db(&self) -> &Database {
        &self.inner
    }

    /// Run raw SQL against the test database
    pub async fn execute(&self, sql: &str) {
        self.inner
            .connection()
            .execute_unprepared(sql)
            .await
            .expect("Failed to execute SQL");
    }

    /// Storage layer over this database
    pub fn storage(&self) -> StorageLayer {
        StorageLayer::from_database(self.inner.clone())
    }
}

/// In-memory SQLite only supports a single connection
pub fn test_db_config() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connection_timeout: 5,
        enabled: true,
    }
}
