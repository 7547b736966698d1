//! Scripthost CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use scripthost_cli::cli::Cli;
use scripthost_cli::commands;
use scripthost_devsupport::{DevSupportClient, DevSupportConfig};

fn main() {
    // Load .env.local if it exists (for SCRIPTHOST_DEBUG_HOST etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    let result = DevSupportClient::new(DevSupportConfig::default())
        .map_err(commands::CliError::from)
        .and_then(|client| commands::execute(&client, cli.command, &cli.host));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
