//! Chain vault operator binary.
//!
//! Reads and writes vault records from the command line and runs the
//! end-to-end deployment check.
//!
//! # Usage
//!
//! ```bash
//! # Store and read back a record
//! chain-vault --contract-id C... --admin-secret S... \
//!     put Posts p1 '{"Title":"Flood Relief","NeedAmount":5000}'
//! chain-vault get Posts p1
//!
//! # Configure through the environment instead
//! VAULT_CONTRACT_ID=C... STACK_ADMIN_SECRET=S... chain-vault get-all Posts
//!
//! # Validate a deployment
//! chain-vault simulate
//! ```

mod commands;
mod config;
mod simulate;

use std::{io::IsTerminal, process::ExitCode};

use chain_vault_sdk::Vault;
use clap::Parser;
use config::{Cli, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    let vault = match cli.connection.to_vault_config().and_then(Vault::connect) {
        Ok(vault) => vault,
        Err(e) => {
            tracing::error!(error = %e, "failed to configure vault client");
            return ExitCode::FAILURE;
        },
    };
    if let Some(contract_id) = vault.contract_status().contract_id() {
        tracing::debug!(contract_id, rpc_url = %cli.connection.rpc_url, "vault client ready");
    }

    let result = commands::run(&vault, cli.command).await;
    vault.shutdown();

    match result {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to render output");
                ExitCode::FAILURE
            },
        },
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        },
    }
}

/// Initializes the logging system.
///
/// Supports three formats:
/// - `Text`: Human-readable format
/// - `Json`: JSON structured logging
/// - `Auto`: JSON for non-TTY stdout, text otherwise
///
/// Logs go to stderr so stdout carries only command output.
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
