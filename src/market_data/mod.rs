//! Upstream candle fetch used for live quotes.

pub mod alpha_vantage;
pub mod yahoo;

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::AppError;
use crate::model::TimePoint;

pub use alpha_vantage::AlphaVantageSource;
pub use yahoo::YahooChartSource;

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,
    #[serde(default = "default_alpha_vantage_base_url")]
    pub alpha_vantage_base_url: String,
    #[serde(default = "default_attempts")]
    pub attempts: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(skip)]
    pub alpha_vantage_api_key: Option<String>,
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_alpha_vantage_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_attempts() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: default_yahoo_base_url(),
            alpha_vantage_base_url: default_alpha_vantage_base_url(),
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            alpha_vantage_api_key: None,
        }
    }
}

/// Index tickers such as `^GSPC` are only served by Yahoo.
pub fn looks_like_index(symbol: &str) -> bool {
    symbol.starts_with('^')
}

pub struct MarketDataClient {
    yahoo: YahooChartSource,
    alpha_vantage: Option<AlphaVantageSource>,
    attempts: usize,
    retry_delay: Duration,
}

impl MarketDataClient {
    pub fn new(cfg: &MarketDataConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("failed to build market data HTTP client")?;
        let alpha_vantage = cfg
            .alpha_vantage_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| AlphaVantageSource::new(http.clone(), &cfg.alpha_vantage_base_url, k));
        Ok(Self {
            yahoo: YahooChartSource::new(http, &cfg.yahoo_base_url),
            alpha_vantage,
            attempts: cfg.attempts.max(1),
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
        })
    }

    pub fn has_alpha_vantage(&self) -> bool {
        self.alpha_vantage.is_some()
    }

    /// Alpha Vantage first when configured and the symbol is not an index,
    /// then Yahoo with bounded retries. The last Yahoo error is returned.
    pub async fn fetch_latest_candles(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<TimePoint>, AppError> {
        if let Some(av) = self
            .alpha_vantage
            .as_ref()
            .filter(|_| !looks_like_index(symbol))
        {
            match av.get_intraday(symbol, interval).await {
                Ok(candles) => return Ok(candles),
                Err(e) => {
                    tracing::warn!(symbol, error = %format!("{e:#}"), "Alpha Vantage fetch failed; falling back to Yahoo");
                }
            }
        }

        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.yahoo.get_candles(symbol, range, interval).await {
                Ok(candles) => return Ok(candles),
                Err(e) => {
                    tracing::warn!(symbol, attempt, error = %format!("{e:#}"), "Yahoo fetch failed");
                    last_err = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(AppError::UpstreamFetch(match last_err {
            Some(e) => format!("{e:#}"),
            None => "unknown data fetch error".to_string(),
        }))
    }
}
