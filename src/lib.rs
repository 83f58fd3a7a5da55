//! # helpdesk-webhooks
//!
//! Outbound webhooks for the helpdesk: a registry of receiver endpoints,
//! HMAC-signed JSON delivery with bounded timeouts, a persisted delivery
//! ledger and a background retry worker.
//!
//! ## Producing events
//!
//! ```rust,no_run
//! use helpdesk_webhooks::core::webhooks::{Event, EventType};
//! use helpdesk_webhooks::server::AppState;
//! use helpdesk_webhooks::storage::StorageLayer;
//! use helpdesk_webhooks::Config;
//! use serde_json::{json, Map};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = StorageLayer::new(config.storage()).await?;
//!     let state = AppState::new(config, storage)?;
//!
//!     let mut data = Map::new();
//!     data.insert("ticket_id".to_string(), json!(42));
//!     let report = state
//!         .dispatcher
//!         .dispatch(&Event::new(EventType::TicketCreated, data))
//!         .await?;
//!     println!("{} of {} deliveries succeeded", report.succeeded, report.matched);
//!     Ok(())
//! }
//! ```
//!
//! ## Server mode
//!
//! ```rust,no_run
//! use helpdesk_webhooks::{Config, server::builder::run_server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/webhooks.yaml").await?;
//!     run_server(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod auth;
pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{Result, WebhookError};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information, filled in by the build script
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version number
    pub version: &'static str,
    /// Build timestamp (unix seconds)
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
    /// Rust version
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: env!("BUILD_TIME"),
            git_hash: env!("GIT_HASH"),
            rust_version: env!("RUST_VERSION"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
