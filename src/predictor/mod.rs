//! Buy/sell recommendations on top of a return-predicting model.
//!
//! The model itself is opaque: it sees the last `window_len` closes and a
//! categorical symbol id and returns one predicted return. The sign decides
//! the signal, the scaled magnitude is the confidence.

pub mod ewma;
pub mod remote;
pub mod scorecard;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::Signal;

pub use ewma::EwmaReturnPredictor;
pub use remote::RemotePredictor;
pub use scorecard::{
    backtest_predictions, ModelPerformance, OnlinePredictorMetrics, PREDICTOR_METRIC_WINDOW,
    PREDICTOR_R2_MIN_SAMPLES,
};

pub const DEFAULT_WINDOW_LEN: usize = 60;
pub const DEFAULT_BUY_THRESHOLD: f64 = 0.0;
pub const DEFAULT_CONFIDENCE_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_window_len")]
    pub window_len: usize,
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,
    #[serde(default = "default_confidence_scale")]
    pub confidence_scale: f64,
}

fn default_window_len() -> usize {
    DEFAULT_WINDOW_LEN
}

fn default_buy_threshold() -> f64 {
    DEFAULT_BUY_THRESHOLD
}

fn default_confidence_scale() -> f64 {
    DEFAULT_CONFIDENCE_SCALE
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            buy_threshold: DEFAULT_BUY_THRESHOLD,
            confidence_scale: DEFAULT_CONFIDENCE_SCALE,
        }
    }
}

/// `Buy` strictly above the threshold, `Sell` otherwise; confidence is
/// `|prediction| * confidence_scale`. Non-finite predictions count as 0.
pub fn derive_signal(prediction: f64, cfg: &SignalConfig) -> (Signal, f64) {
    let prediction = if prediction.is_finite() {
        prediction
    } else {
        0.0
    };
    let signal = if prediction > cfg.buy_threshold {
        Signal::Buy
    } else {
        Signal::Sell
    };
    let confidence = prediction.abs() * cfg.confidence_scale;
    let confidence = if confidence.is_finite() {
        confidence
    } else {
        0.0
    };
    (signal, confidence)
}

pub fn trailing_closes(closes: &[f64], window_len: usize) -> Option<&[f64]> {
    if window_len == 0 || closes.len() < window_len {
        return None;
    }
    Some(&closes[closes.len() - window_len..])
}

/// Model backends, dispatched by variant.
pub enum PredictorModel {
    Ewma(EwmaReturnPredictor),
    Remote(RemotePredictor),
}

impl PredictorModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ewma(_) => "ewma-return-v1",
            Self::Remote(_) => "remote-sequence-model",
        }
    }

    pub async fn predict(&self, closes: &[f64], symbol_id: usize) -> Result<f64, AppError> {
        match self {
            Self::Ewma(m) => Ok(m.predict(closes)),
            Self::Remote(m) => m
                .predict(closes, symbol_id)
                .await
                .map_err(|e| AppError::Predictor(format!("{e:#}"))),
        }
    }

    /// Walk-forward statistics; only local models can be replayed.
    pub fn performance(&self, closes: &[f64], window_len: usize) -> Option<ModelPerformance> {
        match self {
            Self::Ewma(m) => Some(
                backtest_predictions(closes, m, window_len, PREDICTOR_METRIC_WINDOW).summary(),
            ),
            Self::Remote(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub symbol_id: usize,
    pub signal: Signal,
    pub predicted_return: f64,
    pub confidence_pct: f64,
    pub model: String,
    pub as_of_ms: Option<i64>,
}

pub async fn recommend(
    model: &PredictorModel,
    cfg: &SignalConfig,
    symbol: &str,
    symbol_id: usize,
    closes: &[f64],
    as_of_ms: Option<i64>,
) -> Result<Recommendation, AppError> {
    let Some(window) = trailing_closes(closes, cfg.window_len) else {
        return Err(AppError::InsufficientHistory {
            symbol: symbol.to_string(),
            have: closes.len(),
            need: cfg.window_len,
        });
    };
    let prediction = model.predict(window, symbol_id).await?;
    let (signal, confidence_pct) = derive_signal(prediction, cfg);
    tracing::debug!(
        symbol,
        symbol_id,
        prediction,
        signal = %signal,
        confidence_pct,
        model = model.name(),
        "Derived signal"
    );
    Ok(Recommendation {
        symbol: symbol.to_string(),
        symbol_id,
        signal,
        predicted_return: if prediction.is_finite() { prediction } else { 0.0 },
        confidence_pct,
        model: model.name().to_string(),
        as_of_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_prediction_is_sell_with_no_confidence() {
        let (signal, conf) = derive_signal(0.0, &SignalConfig::default());
        assert_eq!(signal, Signal::Sell);
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn trailing_closes_requires_full_window() {
        let closes = [1.0, 2.0, 3.0];
        assert_eq!(trailing_closes(&closes, 2), Some(&closes[1..]));
        assert_eq!(trailing_closes(&closes, 4), None);
        assert_eq!(trailing_closes(&closes, 0), None);
    }
}
