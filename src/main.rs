//! helpdesk-webhooks server binary

use anyhow::Context;
use clap::Parser;
use helpdesk_webhooks::server::builder::{load_config, run_server};
use helpdesk_webhooks::utils::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "webhook-server", version, about = "Helpdesk outbound webhook service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "WEBHOOKS_CONFIG", default_value = "config/webhooks.yaml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(Some(&cli.config))
        .await
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    init_logging(config.logging());

    if cli.check_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    run_server(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
