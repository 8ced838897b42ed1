//! Smart-link preview service (soundraiser-preview) - Main entry point
//!
//! Serves social-media preview cards and browser redirect pages for smart
//! links, backed by the hosted PostgREST API or a local SQLite mirror.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use soundraiser_common::config::{
    load_toml_config, resolve_config_path, ConfigOverrides, ServiceConfig,
};
use soundraiser_preview::{build_router, store, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for soundraiser-preview
#[derive(Parser, Debug)]
#[command(name = "soundraiser-preview")]
#[command(about = "Crawler-aware smart-link preview renderer")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SOUNDRAISER_CONFIG")]
    config: Option<PathBuf>,

    /// Backend URL: https://<project>.supabase.co or sqlite://path
    #[arg(long, env = "SUPABASE_URL")]
    backend_url: Option<String>,

    /// Backend API key (required for http(s) backends)
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    backend_key: Option<String>,

    /// Public site origin used for absolute URLs
    #[arg(long, env = "SITE_URL")]
    site_origin: Option<String>,

    /// Site name shown in titles and the fallback page
    #[arg(long, env = "SOUNDRAISER_SITE_NAME")]
    site_name: Option<String>,

    /// Address to bind
    #[arg(long, env = "SOUNDRAISER_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SOUNDRAISER_PORT")]
    port: Option<u16>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend_url: self.backend_url.clone(),
            backend_key: self.backend_key.clone(),
            site_origin: self.site_origin.clone(),
            site_name: self.site_name.clone(),
            bind_address: self.bind.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level lives in the config file, so read it before tracing is up
    let config_path = resolve_config_path(args.config.as_deref());
    let toml = load_toml_config(config_path.as_deref()).context("Failed to load config file")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "soundraiser_preview={level},soundraiser_common={level},tower_http={level}",
                    level = toml.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Soundraiser preview (soundraiser-preview) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using defaults and command-line settings"),
    }

    let config = ServiceConfig::resolve(args.overrides(), toml)
        .context("Invalid configuration")?;
    info!("Site origin: {}", config.origin_str());
    info!(
        "Cache TTL {}s, stale-while-revalidate {}s",
        config.cache_ttl.as_secs(),
        config.stale_while_revalidate.as_secs()
    );

    let link_store = store::connect(&config)
        .await
        .context("Failed to initialize link store")?;

    let state = AppState::new(link_store, &config);
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("soundraiser-preview listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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
