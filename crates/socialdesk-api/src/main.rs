//! SocialDesk HTTP API entry point.
//!
//! Binary name: `socialdesk`
//!
//! Parses CLI arguments, loads config from the data directory, wires
//! services, then serves HTTP or runs a maintenance command.

mod cli;
mod http;
mod state;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use socialdesk_core::session::SessionStore;
use socialdesk_infra::config::load_server_config;
use socialdesk_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use socialdesk_infra::sqlite::pool::DatabasePool;
use socialdesk_infra::sqlite::session::SqliteSessionBackend;
use socialdesk_observe::tracing_setup::{init_tracing, shutdown_tracing};
use socialdesk_types::config::ServerConfig;
use socialdesk_types::session::{Provider, SessionUser};

use cli::{Cli, Commands, SessionAction};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(otel, cli::log_directive(cli.verbose))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = cli.data_dir.clone().unwrap_or_else(resolve_data_dir);
    let config = load_server_config(&data_dir).await;

    let result = match cli.command {
        Commands::Serve { host, port, .. } => serve(data_dir, config, host, port).await,
        Commands::Session {
            action:
                SessionAction::Create {
                    provider,
                    provider_id,
                    email,
                    name,
                },
        } => create_session(&data_dir, &config, provider, provider_id, email, name).await,
    };

    shutdown_tracing();
    result
}

async fn serve(
    data_dir: std::path::PathBuf,
    mut config: ServerConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::init(data_dir, config).await?;
    tracing::info!(data_dir = %state.data_dir.display(), "state initialized");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(%addr, "SocialDesk API listening");

    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    db_pool.close().await;

    tracing::info!("server stopped");
    Ok(())
}

async fn create_session(
    data_dir: &Path,
    config: &ServerConfig,
    provider: Provider,
    provider_id: String,
    email: String,
    name: String,
) -> anyhow::Result<()> {
    ensure_data_dir(data_dir).await?;
    let pool = DatabasePool::open(data_dir).await?;
    let sessions = SessionStore::new(SqliteSessionBackend::new(pool));

    let user = SessionUser {
        id: format!("{provider}_{provider_id}"),
        provider_id,
        email,
        name,
        picture: None,
        provider,
    };
    let session_id = sessions
        .create(user, chrono::TimeDelta::days(config.session.ttl_days))
        .await?;

    println!("{session_id}");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
