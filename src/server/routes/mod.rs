//! HTTP route modules

pub mod health;
pub mod webhooks;

use crate::utils::error::{Result, WebhookError};

/// Parse a numeric path segment, rejecting garbage with a 400
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| WebhookError::validation(format!("Invalid {} ID", what)))
}
