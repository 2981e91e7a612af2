//! Builds stores from the configured tables and keeps the shared one fresh.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::config::DataConfig;
use crate::store::{load_symbol_table, SeriesStore, SharedStore};
use crate::window::now_ms;

pub fn load_store(cfg: &DataConfig) -> Result<SeriesStore> {
    let prices = load_symbol_table("prices", &cfg.prices_csv, None)
        .with_context(|| format!("failed to load {}", cfg.prices_csv.display()))?;
    let features = match &cfg.features_csv {
        Some(path) => Some(
            load_symbol_table("features", path, None)
                .with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => None,
    };
    Ok(SeriesStore::new(prices, features, now_ms()))
}

/// Loads a new store and swaps it in. On failure the current store stays.
pub fn reload(shared: &SharedStore, cfg: &DataConfig) -> Result<()> {
    let store = load_store(cfg)?;
    let symbols = store.available_symbols().len();
    let previous = shared.replace(store);
    tracing::info!(
        symbols,
        previous_loaded_at_ms = previous.loaded_at_ms(),
        "Series store refreshed"
    );
    Ok(())
}

pub async fn run_refresh_loop(
    shared: Arc<SharedStore>,
    cfg: DataConfig,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; startup already loaded the store.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let shared = Arc::clone(&shared);
                let cfg = cfg.clone();
                match tokio::task::spawn_blocking(move || reload(&shared, &cfg)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %format!("{e:#}"), "Series store refresh failed; keeping previous snapshot"),
                    Err(e) => tracing::error!(error = %e, "Series store refresh task panicked"),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Refresh loop stopped");
}
