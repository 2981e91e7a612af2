pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;

use crate::config::{Config, SymbolsConfig};
use crate::market_data::MarketDataClient;
use crate::metrics::FeatureColumns;
use crate::predictor::{EwmaReturnPredictor, PredictorModel, RemotePredictor, SignalConfig};
use crate::store::SharedStore;

pub use error::ApiError;

/// Shared state handed to every route handler.
pub struct AppState {
    pub store: Arc<SharedStore>,
    pub columns: FeatureColumns,
    pub signal: SignalConfig,
    pub predictor: PredictorModel,
    pub market: MarketDataClient,
    pub symbols: SymbolsConfig,
}

impl AppState {
    pub fn from_config(config: &Config, store: Arc<SharedStore>) -> Result<Arc<Self>> {
        let predictor = match config.signal.model_url() {
            Some(url) => PredictorModel::Remote(RemotePredictor::new(
                url,
                Duration::from_millis(config.signal.model_timeout_ms),
            )?),
            None => PredictorModel::Ewma(EwmaReturnPredictor::new(config.signal.ewma_alpha)),
        };
        let market = MarketDataClient::new(&config.market_data)
            .context("failed to build market data client")?;
        tracing::info!(
            model = predictor.name(),
            alpha_vantage = market.has_alpha_vantage(),
            "Application state ready"
        );
        Ok(Arc::new(Self {
            store,
            columns: config.metrics.clone(),
            signal: config.signal.signal,
            predictor,
            market,
            symbols: config.symbols.clone(),
        }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    routes::routes().with_state(state)
}
