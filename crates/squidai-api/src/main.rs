//! SquidAI server and terminal client entry point.
//!
//! Binary name: `squid`
//!
//! Loads `.env` files, `squidai.toml` and environment overrides, then either
//! serves the HTTP API, runs the terminal chat against a server, or prints
//! configuration status.

mod cli;
mod http;
mod state;

use clap::Parser;

use squidai_core::client::controller::ClientIdentity;
use squidai_infra::config::{
    Secrets, apply_env_overrides, load_config, load_dotenv, resolve_data_dir,
};
use squidai_observe::tracing_setup::{LogLevel, init_tracing, shutdown_tracing};

use cli::chat::loop_runner::{ChatArgs, run_chat_loop};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` can supply clap's `env` fallbacks.
    let dotenv = load_dotenv();
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    let level = match (&cli.command, cli.verbose) {
        // Keep the interactive chat quiet unless asked.
        (Commands::Chat { .. }, 0) => LogLevel::Quiet,
        _ => LogLevel::from_flags(cli.verbose, cli.quiet),
    };
    init_tracing(level, otel).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    dotenv.log();

    let data_dir = resolve_data_dir();
    let mut config = load_config(&data_dir).await;
    apply_env_overrides(&mut config);

    let result = match cli.command {
        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config, data_dir, cli.quiet).await
        }

        Commands::Chat {
            server,
            typewriter,
            images,
            user_id,
            email,
        } => {
            run_chat_loop(ChatArgs {
                server,
                typewriter,
                images,
                identity: ClientIdentity { user_id, email },
            })
            .await
        }

        Commands::Status => {
            cli::status::status(&config, &Secrets::from_env(), &data_dir, cli.json).await
        }
    };

    shutdown_tracing();
    result
}

async fn serve(
    config: squidai_types::config::AppConfig,
    data_dir: std::path::PathBuf,
    quiet: bool,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let public_url = config
        .server
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://{addr}"));

    let state = AppState::init(config, Secrets::from_env(), data_dir).await?;
    let durable = state.sessions.has_durable();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, durable_store = durable, "SquidAI listening");
    if !quiet {
        println!(
            "  {} SquidAI listening on {}",
            console::style("🦑").bold(),
            console::style(&public_url).cyan()
        );
        println!(
            "  {}",
            console::style(if durable {
                "Sessions: MongoDB for signed-in users, local store for guests"
            } else {
                "Sessions: local store"
            })
            .dim()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
