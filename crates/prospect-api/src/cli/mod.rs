//! CLI command definitions and dispatch for the `prospect` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are flat verbs
//! (e.g., `prospect serve`, `prospect status`).

pub mod status;
pub mod topics;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run the simulated-customer side of a sales-training chat.
#[derive(Parser)]
#[command(name = "prospect", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// System status dashboard.
    Status,

    /// List the topic pool the simulated customer draws from.
    Topics,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
