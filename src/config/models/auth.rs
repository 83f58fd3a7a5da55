//! Authentication configuration

use super::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEV_JWT_SECRET: &str = "change-me-helpdesk-webhooks-dev-secret";

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret for bearer tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,
    /// Expected token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_expiration: default_jwt_expiration(),
            issuer: default_issuer(),
        }
    }
}

impl AuthConfig {
    /// Validate auth configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("JWT secret cannot be empty".to_string());
        }
        if self.jwt_expiration == 0 {
            return Err("JWT expiration cannot be 0".to_string());
        }
        Ok(())
    }
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

/// Log a warning when the service runs with the built-in development secret
pub fn warn_insecure_config(config: &AuthConfig) {
    if config.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the default JWT secret; set auth.jwt_secret or JWT_SECRET in production");
    } else if config.jwt_secret.len() < 32 {
        warn!("JWT secret is shorter than 32 characters");
    }
}
