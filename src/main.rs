//! Shorts Segment Processor
//!
//! An HTTP service that cuts a time window out of a remote video, reframes
//! it to a 1080x1920 portrait frame with caption and call-to-action overlays,
//! and returns it inline or through a short-lived download handle. It also
//! turns a video's caption track into a timestamped transcript.

#![allow(dead_code)]

mod cleanup;
mod config;
mod config_file;
mod error;
mod fetch;
mod http;
#[cfg(test)]
mod integration;
mod naming;
mod pipeline;
mod render;
mod state;
mod store;
mod subtitle;
mod tool;
mod transcript;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::{ProcessorError, Result};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "shorts-processor";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (mut config, load_error) = if std::path::Path::new(&config_path).exists() {
        match crate::config_file::ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (ServerConfig::default(), Some(e)),
        }
    } else {
        (ServerConfig::default(), None)
    };
    config.apply_env();

    // Initialize logging
    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }

    std::fs::create_dir_all(&config.temp_dir)?;
    crate::fetch::credentials::provision(&mut config)?;
    tracing::info!("Configuration loaded: {:?}", config);

    // Create application state
    let state = Arc::new(AppState::new(config.clone()));

    // Background task: evict expired artifacts
    let sweeper = state.store.spawn_sweeper();

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| ProcessorError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    sweeper.abort();
    let purged = state.store.purge();
    tracing::info!("Shutdown complete, removed {} stored artifact(s)", purged);

    Ok(())
}

/// Resolves on ctrl-c
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    state.shutdown();
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "shorts_processor={},tower_http={}",
            config.log_level, config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
