use std::collections::VecDeque;

use serde::Serialize;

use crate::predictor::ewma::EwmaReturnPredictor;

pub const PREDICTOR_METRIC_WINDOW: usize = 1200;
pub const PREDICTOR_R2_MIN_SAMPLES: usize = 60;

/// Replay scorecard over the most recent `capacity` (realized, predicted)
/// return pairs. Error sums are kept incrementally so the summary is O(1).
#[derive(Debug, Clone)]
pub struct OnlinePredictorMetrics {
    capacity: usize,
    pairs: VecDeque<(f64, f64)>,
    abs_err: f64,
    sq_err: f64,
    sum_realized: f64,
    sum_realized_sq: f64,
    hits: usize,
}

impl Default for OnlinePredictorMetrics {
    fn default() -> Self {
        Self::with_window(PREDICTOR_METRIC_WINDOW)
    }
}

fn same_sign(realized: f64, predicted: f64) -> bool {
    realized * predicted > 0.0
}

impl OnlinePredictorMetrics {
    pub fn with_window(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            pairs: VecDeque::with_capacity(capacity),
            abs_err: 0.0,
            sq_err: 0.0,
            sum_realized: 0.0,
            sum_realized_sq: 0.0,
            hits: 0,
        }
    }

    /// Adds one replayed step. Non-finite pairs are dropped.
    pub fn record(&mut self, realized: f64, predicted: f64) {
        if !realized.is_finite() || !predicted.is_finite() {
            return;
        }
        self.apply(realized, predicted, 1.0);
        self.pairs.push_back((realized, predicted));
        if self.pairs.len() > self.capacity {
            if let Some((r, p)) = self.pairs.pop_front() {
                self.apply(r, p, -1.0);
            }
        }
    }

    fn apply(&mut self, realized: f64, predicted: f64, sign: f64) {
        let err = realized - predicted;
        self.abs_err += sign * err.abs();
        self.sq_err += sign * err * err;
        self.sum_realized += sign * realized;
        self.sum_realized_sq += sign * realized * realized;
        if same_sign(realized, predicted) {
            if sign > 0.0 {
                self.hits += 1;
            } else {
                self.hits = self.hits.saturating_sub(1);
            }
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.pairs.len() as u64
    }

    pub fn mae(&self) -> Option<f64> {
        let n = self.pairs.len();
        (n > 0).then(|| self.abs_err.max(0.0) / n as f64)
    }

    /// Share of steps where the predicted and realized returns agree in sign.
    pub fn hit_rate(&self) -> Option<f64> {
        let n = self.pairs.len();
        (n > 0).then(|| self.hits as f64 / n as f64)
    }

    /// Needs at least [`PREDICTOR_R2_MIN_SAMPLES`] steps; a flat realized
    /// series scores 0.
    pub fn r2(&self) -> Option<f64> {
        let n = self.pairs.len();
        if n < PREDICTOR_R2_MIN_SAMPLES {
            return None;
        }
        let total = self.sum_realized_sq - self.sum_realized * self.sum_realized / n as f64;
        if total <= 1e-18 {
            return Some(0.0);
        }
        let r2 = 1.0 - self.sq_err.max(0.0) / total;
        Some(if r2.is_finite() { r2 } else { 0.0 })
    }

    pub fn summary(&self) -> ModelPerformance {
        ModelPerformance {
            samples: self.sample_count(),
            hit_rate: self.hit_rate(),
            mae: self.mae(),
            r2: self.r2(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub samples: u64,
    pub hit_rate: Option<f64>,
    pub mae: Option<f64>,
    pub r2: Option<f64>,
}

/// Walk-forward replay: each trailing window of `window_len` closes
/// predicts the next bar's simple return.
pub fn backtest_predictions(
    closes: &[f64],
    model: &EwmaReturnPredictor,
    window_len: usize,
    metric_window: usize,
) -> OnlinePredictorMetrics {
    let mut out = OnlinePredictorMetrics::with_window(metric_window);
    let window_len = window_len.max(2);
    if closes.len() <= window_len {
        return out;
    }
    for t in window_len..closes.len() {
        let prev = closes[t - 1];
        if prev <= f64::EPSILON {
            continue;
        }
        let realized = closes[t] / prev - 1.0;
        let predicted = model.predict(&closes[t - window_len..t]);
        out.record(realized, predicted);
    }
    out
}
