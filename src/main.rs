use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use std::io::Write;

use ferroftpd::config::Config;
use ferroftpd::core_cli::Cli;
use ferroftpd::helpers;
use ferroftpd::server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    // Load configuration from the TOML file
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    // CLI overrides
    if let Some(port) = args.port {
        config.server.listen_port = Some(port);
    }
    if let Some(root) = args.root {
        config.server.root_path = root;
    }

    info!("Starting ferroftpd with configuration:");
    helpers::log_config(&config);

    let mut server = Server::new(config);
    server.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");
    server.stop().await;

    Ok(())
}
