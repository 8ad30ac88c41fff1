//! CLI command definitions for the `squid` binary.

pub mod chat;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SquidAI chat relay server and terminal client.
#[derive(Parser)]
#[command(name = "squid", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (chat relay, sessions, telemetry).
    Serve {
        /// Address to bind (overrides squidai.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides squidai.toml and PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Export spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Chat with a running server from the terminal.
    Chat {
        /// Server base URL.
        #[arg(long, env = "SQUIDAI_SERVER", default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Reveal replies one character at a time instead of chunk by chunk.
        #[arg(long)]
        typewriter: bool,

        /// Attach an image to the first message (repeatable).
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Signed-in user id sent as `x-user-id`.
        #[arg(long, env = "SQUIDAI_USER_ID")]
        user_id: Option<String>,

        /// Signed-in user email sent as `x-user-email`.
        #[arg(long, env = "SQUIDAI_USER_EMAIL")]
        email: Option<String>,
    },

    /// Show which credentials are configured and ping the document store.
    Status,
}
