//! CLI command definitions for the `funnelbot` binary.

pub mod config;
pub mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// WhatsApp sales and support funnel bot.
#[derive(Parser)]
#[command(name = "funnelbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding funnel.toml and contacts.json.
    #[arg(long, global = true, env = "FUNNELBOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (inbound webhook, conversation admin, metrics).
    Serve {
        /// Address to bind; defaults to `transport.bind` from funnel.toml.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Chat with the funnel on the console.
    Simulate {
        /// User id the console speaks as.
        #[arg(long, default_value = "5511999990000@s.whatsapp.net")]
        user: String,

        /// Seed phrasing and credentials for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,

        /// Send follow-ups immediately instead of after the configured delay.
        #[arg(long)]
        no_delay: bool,
    },

    /// Inspect or create funnel.toml.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write the default funnel.toml if none exists.
    Init,
    /// Print the config file path.
    Path,
}
