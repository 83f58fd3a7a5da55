//! Server startup with configuration loading

use crate::config::{Config, warn_insecure_config};
use crate::server::server::HttpServer;
use crate::utils::error::Result;
use std::path::Path;
use tracing::info;

/// Load configuration from `path` if it exists, otherwise from the environment
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::from_file(path).await,
        Some(path) => {
            info!(
                "Configuration file {} not found, using defaults and environment",
                path.display()
            );
            Config::from_env()
        }
        None => Config::from_env(),
    }
}

/// Run the server until it is shut down
pub async fn run_server(config: Config) -> Result<()> {
    info!("Starting helpdesk webhook service v{}", env!("CARGO_PKG_VERSION"));
    warn_insecure_config(config.auth());

    let server = HttpServer::new(&config).await?;
    info!("Server starting at: http://{}", config.server().address());
    info!("API Endpoints:");
    info!("   GET  /health - Health check");
    info!("   POST /webhooks - Register a webhook");
    info!("   GET  /webhooks/events - Event catalog");
    info!("   POST /webhooks/trigger - Dispatch an event");
    info!("   POST /webhooks/{{id}}/test - Test delivery");

    server.start().await
}
