//! gallery-api - Category-filtered media/product gallery service
//!
//! Serves the category vocabulary, category-scoped item queries, association
//! writes and server-side filter sessions over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gallery_api::{build_router, AppState};
use gallery_common::config::{config_file_path, load_toml, Backend, ConfigOverrides, GalleryConfig};
use gallery_common::db::init_database;
use gallery_common::store::{SqliteStore, WooCommerceStore};

/// Command-line arguments for gallery-api
#[derive(Parser, Debug)]
#[command(name = "gallery-api")]
#[command(about = "Category-filtered gallery service")]
#[command(version)]
struct Args {
    /// Config file (defaults to $GALLERY_CONFIG, then the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "GALLERY_BIND")]
    bind: Option<String>,

    /// SQLite catalog location
    #[arg(short, long, env = "GALLERY_DATABASE")]
    database: Option<PathBuf>,

    /// Association store backend: sqlite or woocommerce
    #[arg(long, env = "GALLERY_BACKEND")]
    backend: Option<String>,

    /// Seconds before an idle filter session expires
    #[arg(long, env = "GALLERY_SESSION_IDLE_SECS")]
    session_idle_secs: Option<u64>,

    /// WooCommerce API root, e.g. https://shop.example/wp-json/wc/v3
    #[arg(long, env = "GALLERY_WC_URL")]
    wc_url: Option<String>,

    #[arg(long, env = "GALLERY_WC_KEY", hide_env_values = true)]
    wc_key: Option<String>,

    #[arg(long, env = "GALLERY_WC_SECRET", hide_env_values = true)]
    wc_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gallery_api=info,gallery_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gallery-api v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let file = match config_file_path(args.config.as_deref()) {
        Some(path) => load_toml(&path).context("Failed to load config file")?,
        None => None,
    };
    let overrides = ConfigOverrides {
        bind: args.bind,
        database_path: args.database,
        backend: args.backend,
        session_idle_secs: args.session_idle_secs,
        woocommerce_url: args.wc_url,
        woocommerce_key: args.wc_key,
        woocommerce_secret: args.wc_secret,
    };
    let config = GalleryConfig::resolve(file, overrides).context("Invalid configuration")?;
    let session_idle = Duration::from_secs(config.session_idle_secs);

    let state = match config.backend {
        Backend::Sqlite => {
            info!("Database: {}", config.database_path.display());
            let pool = init_database(&config.database_path)
                .await
                .context("Failed to open catalog database")?;
            AppState::with_catalog(SqliteStore::new(pool), session_idle)
        }
        Backend::WooCommerce => {
            let wc = config.woocommerce.clone().unwrap_or_default();
            info!("WooCommerce feed: {}", wc.base_url);
            let store = WooCommerceStore::new(wc).context("Failed to configure WooCommerce store")?;
            AppState::read_only(Arc::new(store), session_idle)
        }
    };
    info!("Backend: {}", state.store.backend_name());

    // Expire idle sessions even when no request touches them
    let sweep_period = Duration::from_secs((config.session_idle_secs / 4).clamp(1, 60));
    let _sweeper = state.sessions.spawn_sweeper(sweep_period);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("gallery-api listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
