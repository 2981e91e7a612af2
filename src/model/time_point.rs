use std::collections::BTreeMap;

use serde::Serialize;

/// One row of a price table: OHLC, optional volume and any precomputed
/// feature columns carried alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

impl TimePoint {
    pub fn new(timestamp_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume: None,
            features: BTreeMap::new(),
        }
    }

    /// Point with every price field set to `close`.
    pub fn from_close(timestamp_ms: i64, close: f64) -> Self {
        Self::new(timestamp_ms, close, close, close, close)
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_feature(mut self, name: &str, value: f64) -> Self {
        self.features.insert(name.to_string(), value);
        self
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}
