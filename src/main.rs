use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use tradelux::api::{self, AppState};
use tradelux::config::Config;
use tradelux::refresh::{load_store, run_refresh_loop};
use tradelux::store::{SeriesStore, SharedStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set TRADELUX_CONFIG or create config/default.toml");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.logging.level.as_str())
            }),
        )
        .with_ansi(false)
        .json()
        .init();

    tracing::info!(
        bind_addr = %config.server.bind_addr,
        prices_csv = %config.data.prices_csv.display(),
        refresh_interval = %config.data.refresh_interval,
        "Starting tradelux"
    );

    // A missing table is not fatal: requests answer `no_data` until a
    // refresh succeeds.
    let initial = match load_store(&config.data) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Initial series load failed; starting empty");
            SeriesStore::default()
        }
    };
    let shared = Arc::new(SharedStore::new(initial));
    let state = AppState::from_config(&config, Arc::clone(&shared))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_every = Duration::from_millis(config.data.refresh_interval_ms()?);
    let refresh_task = tokio::spawn(run_refresh_loop(
        Arc::clone(&shared),
        config.data.clone(),
        refresh_every,
        shutdown_rx,
    ));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    let _ = shutdown_tx.send(true);
    let _ = refresh_task.await;
    tracing::info!("tradelux stopped");
    Ok(())
}
