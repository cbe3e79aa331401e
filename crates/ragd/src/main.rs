//! ragd — retrieval-augmented question-answering service.
//!
//! Loads configuration from the environment, wires the provider stack,
//! and serves the HTTP API until interrupted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragd_infrastructure::config::AppConfig;
use ragd_infrastructure::logging;
use tracing::info;

/// Retrieval-augmented question-answering service
#[derive(Parser)]
#[command(name = "ragd")]
#[command(about = "Retrieval-augmented question-answering service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Load and validate configuration, then exit
    CheckConfig,
}

/// Hourly sweep removing terminal jobs older than a day.
const JANITOR_INTERVAL_SECS: u64 = 3600;
const JANITOR_RETENTION_HOURS: u64 = 24;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("configuration is invalid")?;
    logging::init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::CheckConfig => {
            info!(
                store = %config.store_url,
                vector_store = %config.vector_store_url,
                embedding_provider = %config.embedding_provider,
                "configuration is valid"
            );
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    let state = ragd_server::build_state(config)
        .await
        .context("failed to build application state")?;

    std::sync::Arc::clone(&state.sse).spawn_sweeper();
    spawn_job_janitor(&state);

    let router = ragd_server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "ragd listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("shutdown complete");
    Ok(())
}

fn spawn_job_janitor(state: &ragd_server::AppState) {
    let orchestrator = std::sync::Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(JANITOR_INTERVAL_SECS));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match orchestrator.cleanup_older_than(JANITOR_RETENTION_HOURS).await {
                Ok(cleaned) if cleaned > 0 => {
                    info!(cleaned, "janitor removed completed jobs");
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, "janitor sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
