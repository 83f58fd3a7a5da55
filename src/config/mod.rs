//! Configuration management for the webhook service
//!
//! This module handles loading, validation, and management of all service configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{Result, WebhookError};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the webhook service
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Service configuration
    pub app: AppConfig,
}

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| WebhookError::Config(format!("Failed to read config file: {}", e)))?;

        let mut app: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| WebhookError::Config(format!("Failed to parse config: {}", e)))?;
        app.apply_env_overrides().map_err(WebhookError::Config)?;

        let config = Self { app };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut app = AppConfig::default();
        app.apply_env_overrides().map_err(WebhookError::Config)?;

        let config = Self { app };
        config.validate()?;
        Ok(config)
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.app.server
    }

    /// Get storage configuration
    pub fn storage(&self) -> &StorageConfig {
        &self.app.storage
    }

    /// Get auth configuration
    pub fn auth(&self) -> &AuthConfig {
        &self.app.auth
    }

    /// Get webhook delivery policy
    pub fn webhooks(&self) -> &WebhooksConfig {
        &self.app.webhooks
    }

    /// Get logging configuration
    pub fn logging(&self) -> &LoggingConfig {
        &self.app.logging
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.app
            .server
            .validate()
            .map_err(|e| WebhookError::Config(format!("Server config error: {}", e)))?;

        self.app
            .storage
            .database
            .validate()
            .map_err(|e| WebhookError::Config(format!("Storage config error: {}", e)))?;

        self.app
            .auth
            .validate()
            .map_err(|e| WebhookError::Config(format!("Auth config error: {}", e)))?;

        self.app
            .webhooks
            .validate()
            .map_err(|e| WebhookError::Config(format!("Webhooks config error: {}", e)))?;

        crate::config::models::auth::warn_insecure_config(&self.app.auth);

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.app).map_err(|e| {
            WebhookError::Config(format!("Failed to serialize config to YAML: {}", e))
        })
    }
}
