// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wifidb_cli::cli::Args;
use wifidb_cli::commands;
use wifidb_cli::config::CliConfig;
use wifidb_cli::error::CliError;
use wifidb_engine::{CancellationToken, Engine};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let config = CliConfig::load(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = Engine::new(config.engine)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let output = commands::run(&engine, &args, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
