//! Configuration data models
//!
//! This module defines all configuration structures used by the webhook service.

#![allow(missing_docs)]

pub mod app;
pub mod auth;
pub mod logging;
pub mod server;
pub mod storage;
pub mod webhooks;

pub use app::*;
pub use auth::*;
pub use logging::*;
pub use server::*;
pub use storage::*;
pub use webhooks::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8080
}

/// Default maximum body size in bytes
pub fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB
}

pub fn default_true() -> bool {
    true
}

pub fn default_database_url() -> String {
    "sqlite://webhooks.db?mode=rwc".to_string()
}

pub fn default_max_connections() -> u32 {
    10
}

pub fn default_connection_timeout() -> u64 {
    5
}

pub fn default_jwt_expiration() -> u64 {
    86400 // 24 hours
}

pub fn default_issuer() -> String {
    "helpdesk".to_string()
}

pub fn default_retry_count() -> u32 {
    3
}

pub fn default_timeout_seconds() -> u32 {
    30
}

pub fn default_max_timeout_seconds() -> u32 {
    300
}

pub fn default_retry_backoff_seconds() -> u64 {
    60
}

pub fn default_retry_poll_interval_seconds() -> u64 {
    30
}

pub fn default_retry_batch_size() -> u64 {
    50
}

pub fn default_retry_concurrency() -> usize {
    10
}

pub fn default_delivery_history_limit() -> u64 {
    100
}

pub fn default_max_response_body_bytes() -> usize {
    64 * 1024
}

pub fn default_user_agent() -> String {
    format!("Helpdesk-Webhooks/{}", env!("CARGO_PKG_VERSION"))
}

pub fn default_delivery_retention_days() -> u32 {
    30
}

pub fn default_cleanup_interval_hours() -> u64 {
    24
}

pub fn default_log_level() -> String {
    "info".to_string()
}
