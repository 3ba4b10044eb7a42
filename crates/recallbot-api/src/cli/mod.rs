//! CLI command definitions for the `recallbot` binary.
//!
//! Uses clap derive macros for argument parsing. Two subcommands: `serve`
//! runs the WhatsApp webhook server, `chat` starts the interactive email
//! agent in the terminal.

pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Memory-backed WhatsApp support bot and email agent.
#[derive(Parser)]
#[command(name = "recallbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to the TOML settings file (default: ./recallbot.toml).
    #[arg(long, global = true, env = "RECALLBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the WhatsApp webhook server.
    Serve {
        /// Host to bind to (overrides the config file).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the email agent in the terminal.
    Chat,
}
