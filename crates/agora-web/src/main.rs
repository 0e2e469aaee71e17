//! agora-web: Main Entry Point

use agora_review_store::{SqliteReviewStore, StorePolicy};
use agora_web::{create_router, AppState, ServerConfig, SessionRegistry};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agora-web-server")]
#[command(about = "HTTP server for agora agent reviews")]
struct Args {
    /// Bind address (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Sessions file (TOML)
    #[arg(long)]
    sessions: Option<PathBuf>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from /etc/agora/environment (if exists)
    agora_core::config::load_environment();

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agora_web=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(path) = args.sessions {
        config.sessions_file = Some(path);
    }
    config.enable_cors = !args.no_cors;

    info!("Starting agora-web v{}", env!("CARGO_PKG_VERSION"));

    let store = SqliteReviewStore::new(
        &config.database_url,
        StorePolicy {
            auto_publish: config.auto_publish,
        },
    )
    .await
    .with_context(|| format!("Failed to open review store at {}", config.database_url))?;

    let sessions = match &config.sessions_file {
        Some(path) => SessionRegistry::load(path)?,
        None => {
            warn!("No sessions file configured; every caller is anonymous");
            SessionRegistry::new()
        }
    };

    let state = Arc::new(AppState::new(store, sessions));
    let app = create_router(state.clone(), config.middleware());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
