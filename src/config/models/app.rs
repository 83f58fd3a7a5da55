//! Top-level service configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Top-level configuration, one field per YAML section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Webhook delivery policy
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Apply environment variable overrides on top of the current values
    pub fn apply_env_overrides(&mut self) -> std::result::Result<(), String> {
        if let Ok(host) = std::env::var("WEBHOOKS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WEBHOOKS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| format!("WEBHOOKS_PORT is not a valid port: {}", port))?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.storage.database.url = url;
            self.storage.database.enabled = true;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }
}
