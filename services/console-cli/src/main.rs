//! SmartGas back-office console
//!
//! Command-line client for the SmartGas dashboard API:
//! 1. Logs in and keeps the token pair on disk
//! 2. Sends every call with the stored bearer token
//! 3. Refreshes an expired session once, shared by concurrent calls
//! 4. Prints backend responses as JSON on stdout

mod cli;
mod commands;
mod config;
mod error;
mod resources;

use anyhow::{Context, Result};
use clap::Parser;
use console_gateway::GatewayError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CliArgs, LogFormat};
use crate::config::Config;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output only
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);

    let (config_path, explicit) = Config::resolve_path(args.config.as_deref());
    let config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        credentials_path = %config.session.credentials_path.display(),
        refresh_timeout_secs = config.api.refresh_timeout_secs,
        "configuration loaded"
    );

    let gateway = commands::build_gateway(&config).await?;

    match commands::run(args.command, &gateway).await {
        Ok(outcome) => {
            println!("{}", outcome.render());
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "command failed");
            if let Some(GatewayError::Unauthorized { response, .. }) =
                err.downcast_ref::<GatewayError>()
            {
                println!("{}", response.text());
                eprintln!("session expired, run `smartgas-console login` again");
            }
            eprintln!("error: {err:#}");
            std::process::exit(commands::exit_code_for(&err));
        }
    }
}
