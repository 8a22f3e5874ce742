//! Prospect CLI and REST API entry point.
//!
//! Binary name: `prospect`
//!
//! Parses CLI arguments, initializes the engine and its backing services,
//! then dispatches to the appropriate command handler or starts the REST
//! API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,prospect=debug",
        _ => "trace",
    };
    let enable_otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    prospect_observe::tracing_setup::init_tracing(filter, enable_otel)
        .map_err(anyhow::Error::from_boxed)?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "prospect", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, config, engine)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Topics => {
            cli::topics::topics(&state, cli.json)?;
        }

        Commands::Serve { port, host, .. } => {
            // The engine survives without a key (fallback replies only),
            // but a server nobody configured is a mistake worth refusing.
            if std::env::var("OPENAI_API_KEY").is_err() {
                anyhow::bail!(
                    "OPENAI_API_KEY is not set; the completion backend cannot authenticate"
                );
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Prospect API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let engine = state.engine.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            // Unfired debounce windows would otherwise keep timer tasks
            // alive past the listener.
            engine.shutdown();

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    prospect_observe::tracing_setup::shutdown_tracing();
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
