//! Matchday - football data served from a staleness-driven refresh cache
//!
//! Binary entry point: wires configuration, fetchers, store, cache,
//! scheduler and HTTP server together.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchday::api::{create_router, AppState};
use matchday::cache::{RefreshCache, RefreshOptions};
use matchday::config::Config;
use matchday::fetch::build_client;
use matchday::resource::catalog;
use matchday::store::{EnvelopeStore, FileStore, MemoryStore};
use matchday::tasks::spawn_scheduler;

/// Main entry point for the matchday server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the envelope store and build the resource catalog
/// 4. Restore envelopes persisted by a previous run
/// 5. Start the background refresh scheduler
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchday=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matchday server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        port = config.server_port,
        data_dir = ?config.data_dir,
        frequent_interval = config.frequent_interval,
        infrequent_every = config.infrequent_every,
        fetch_timeout = config.fetch_timeout,
        fetch_attempts = config.fetch_attempts,
        "Configuration loaded"
    );

    let store: Arc<dyn EnvelopeStore> = match &config.data_dir {
        Some(dir) => Arc::new(
            FileStore::open(dir.clone())
                .await
                .with_context(|| format!("opening data directory {}", dir.display()))?,
        ),
        None => {
            warn!("DATA_DIR is empty, envelopes will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let client = build_client().context("building HTTP client")?;
    let cache = Arc::new(RefreshCache::new(
        catalog(&config, client),
        store,
        RefreshOptions::from_config(&config),
    ));
    cache.restore().await;

    // Start background refresh scheduler
    let scheduler_handle = spawn_scheduler(
        cache.clone(),
        config.frequent_period(),
        config.infrequent_every,
    );
    info!("Refresh scheduler started");

    // Create router with all endpoints
    let app = create_router(AppState::from_shared(cache));

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler_handle))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the scheduler and allows graceful shutdown.
/// Refreshes already running are abandoned with the runtime.
async fn shutdown_signal(scheduler_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the scheduler
    scheduler_handle.abort();
    warn!("Refresh scheduler aborted");
}
