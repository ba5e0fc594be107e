use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod actions;
mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use commands::RunArgs;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load();

    match cli.command {
        Commands::Run {
            connection,
            interval,
            resume_threshold,
            on_failure,
        } => {
            let cancel = CancellationToken::new();
            spawn_signal_handler(cancel.clone());
            commands::cmd_run(
                RunArgs {
                    connection,
                    interval,
                    resume_threshold,
                    on_failure,
                },
                &config,
                cancel,
            )
            .await
        }
        Commands::Status { connection, format } => {
            commands::cmd_status(connection, &config, format, cli.no_color).await
        }
        Commands::Vars {
            connection,
            format,
            name,
        } => commands::cmd_vars(connection, &config, format, name).await,
        Commands::ListUps { connection, format } => {
            commands::cmd_list_ups(connection, &config, format, cli.no_color).await
        }
        #[cfg(unix)]
        Commands::Dryer { socket, format } => {
            commands::cmd_dryer(socket, &config, format, cli.no_color).await
        }
    }
}

/// Cancel the token on Ctrl+C or SIGTERM so the monitor can wind down.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        eprintln!("\nShutting down...");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}
