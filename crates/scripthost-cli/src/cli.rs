//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scripthost_devsupport::config::{
    BUNDLE_ENV, DEBUG_HOST_ENV, DEFAULT_BUNDLE, DEFAULT_DEBUG_HOST, DEFAULT_PLATFORM, PLATFORM_ENV,
};

/// Scripthost - development-server client
#[derive(Parser, Debug)]
#[command(name = "scripthost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dev-server host and port
    #[arg(long, env = DEBUG_HOST_ENV, default_value = DEFAULT_DEBUG_HOST)]
    pub host: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a development bundle
    Bundle {
        /// Bundle name without extension
        #[arg(short, long, env = BUNDLE_ENV, default_value = DEFAULT_BUNDLE)]
        bundle: String,

        /// Platform passed to the bundler
        #[arg(short, long, env = PLATFORM_ENV, default_value = DEFAULT_PLATFORM)]
        platform: String,

        /// Write the bundle to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Ask the dev server to open the debugger UI
    LaunchDevtools,

    /// Print a line for every change the dev server reports
    Watch,

    /// Connect to the remote debugger proxy and print incoming frames
    Proxy,
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
