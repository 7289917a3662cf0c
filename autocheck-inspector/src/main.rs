//! autocheck-inspector - Room Cleanliness Inspection Service
//!
//! Accepts room photographs over HTTP, has each one assessed by the
//! configured multimodal backend, and streams per-room status plus the
//! aggregate score to clients over SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use autocheck_common::config::{load_bootstrap_config, resolve_api_key};
use autocheck_common::events::EventBus;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autocheck_inspector::services::{GeminiClient, GeminiConfig, RoomRegistry};
use autocheck_inspector::AppState;

/// Command-line arguments for autocheck-inspector
#[derive(Parser, Debug)]
#[command(name = "autocheck-inspector")]
#[command(about = "Room cleanliness inspection service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "AUTOCHECK_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(short, long, env = "AUTOCHECK_BIND")]
    bind: Option<String>,

    /// Path to TOML config file
    #[arg(short, long, env = "AUTOCHECK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_bootstrap_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting autocheck-inspector (Room Inspection) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let api_key = resolve_api_key(&config.backend).context("Failed to resolve API key")?;
    let assessor = GeminiClient::new(GeminiConfig::from_backend(&config.backend, api_key))
        .context("Failed to create assessment client")?;
    info!(
        model = %assessor.model(),
        language = %config.backend.response_language,
        "Assessment client initialized"
    );

    let event_bus = EventBus::new(256);
    let registry = RoomRegistry::new(Arc::new(assessor), event_bus.clone());

    let state = AppState::new(registry.clone(), event_bus)
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = autocheck_inspector::build_router(state);

    let port = args.port.unwrap_or(config.port);
    let bind = args.bind.unwrap_or(config.bind);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Session ends with the process: release every room and drain assessments
    registry.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
