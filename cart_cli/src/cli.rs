//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "cart", version, about = "Follow-me shopping cart controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the cart UI until `q`, Ctrl-C, or the tick limit
    Run {
        /// Listen for protocol lines on this address (overrides [network] server)
        #[arg(long, value_name = "ADDR")]
        server: Option<String>,
        /// Send outbound messages to this peer (overrides [network] client)
        #[arg(long, value_name = "ADDR")]
        client: Option<String>,
        /// Stop after this many UI ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Ignore stdin; only network, scanner, and signals drive the cart
        #[arg(long, action = ArgAction::SetTrue)]
        no_keys: bool,
    },
    /// Validate the config and catalog, build the controller, and exit
    SelfCheck,
}
