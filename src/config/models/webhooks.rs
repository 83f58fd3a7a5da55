//! Webhook delivery policy

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Defaults and limits for webhook registration, delivery and retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    /// Retry budget applied when a registration omits it
    #[serde(default = "default_retry_count")]
    pub default_retry_count: u32,
    /// Per-call timeout applied when a registration omits it
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u32,
    /// Largest timeout a webhook may request
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u32,
    /// Delay between a failure and its scheduled retry
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
    /// How often the retry worker looks for due deliveries
    #[serde(default = "default_retry_poll_interval_seconds")]
    pub retry_poll_interval_seconds: u64,
    /// Maximum deliveries resent per worker tick
    #[serde(default = "default_retry_batch_size")]
    pub retry_batch_size: u64,
    /// Resends in flight at once within a worker tick
    #[serde(default = "default_retry_concurrency")]
    pub retry_concurrency: usize,
    /// Run the background retry worker
    #[serde(default = "default_true")]
    pub retry_worker_enabled: bool,
    /// Maximum rows returned by the delivery history listing
    #[serde(default = "default_delivery_history_limit")]
    pub delivery_history_limit: u64,
    /// Receiver response bodies are truncated to this many bytes
    #[serde(default = "default_max_response_body_bytes")]
    pub max_response_body_bytes: usize,
    /// User-Agent sent with every delivery
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Deliveries older than this are removed by the cleanup task
    #[serde(default = "default_delivery_retention_days")]
    pub delivery_retention_days: u32,
    /// How often the cleanup task runs
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            default_retry_count: default_retry_count(),
            default_timeout_seconds: default_timeout_seconds(),
            max_timeout_seconds: default_max_timeout_seconds(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
            retry_poll_interval_seconds: default_retry_poll_interval_seconds(),
            retry_batch_size: default_retry_batch_size(),
            retry_concurrency: default_retry_concurrency(),
            retry_worker_enabled: true,
            delivery_history_limit: default_delivery_history_limit(),
            max_response_body_bytes: default_max_response_body_bytes(),
            user_agent: default_user_agent(),
            delivery_retention_days: default_delivery_retention_days(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
        }
    }
}

impl WebhooksConfig {
    pub fn retry_backoff(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retry_backoff_seconds as i64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.retry_poll_interval_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours * 3600)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.delivery_retention_days as i64)
    }

    /// Validate webhook policy
    pub fn validate(&self) -> Result<(), String> {
        if self.default_timeout_seconds == 0 {
            return Err("default_timeout_seconds cannot be 0".to_string());
        }
        if self.default_timeout_seconds > self.max_timeout_seconds {
            return Err(format!(
                "default_timeout_seconds ({}) exceeds max_timeout_seconds ({})",
                self.default_timeout_seconds, self.max_timeout_seconds
            ));
        }
        if self.retry_poll_interval_seconds == 0 {
            return Err("retry_poll_interval_seconds cannot be 0".to_string());
        }
        if self.retry_batch_size == 0 {
            return Err("retry_batch_size cannot be 0".to_string());
        }
        if self.retry_concurrency == 0 {
            return Err("retry_concurrency cannot be 0".to_string());
        }
        if self.delivery_history_limit == 0 {
            return Err("delivery_history_limit cannot be 0".to_string());
        }
        if self.cleanup_interval_hours == 0 {
            return Err("cleanup_interval_hours cannot be 0".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent cannot be empty".to_string());
        }
        Ok(())
    }
}
