use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::TimePoint;
use crate::window::Window;

pub const VOLATILITY_10: &str = "volatility_10";
pub const DAILY_RETURN: &str = "daily_return";
pub const OVERNIGHT_GAP: &str = "overnight_gap";

/// Names of the precomputed feature columns feeding the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureColumns {
    #[serde(default = "default_volatility_column")]
    pub volatility: String,
    #[serde(default = "default_daily_return_column")]
    pub daily_return: String,
    #[serde(default = "default_overnight_gap_column")]
    pub overnight_gap: String,
}

fn default_volatility_column() -> String {
    VOLATILITY_10.to_string()
}

fn default_daily_return_column() -> String {
    DAILY_RETURN.to_string()
}

fn default_overnight_gap_column() -> String {
    OVERNIGHT_GAP.to_string()
}

impl Default for FeatureColumns {
    fn default() -> Self {
        Self {
            volatility: default_volatility_column(),
            daily_return: default_daily_return_column(),
            overnight_gap: default_overnight_gap_column(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub symbol: String,
    pub as_of_ms: i64,
    pub last_value: f64,
    pub prior_value: f64,
    pub percent_change: f64,
    pub direction: Direction,
    pub volatility: f64,
    pub daily_return: f64,
    pub overnight_gap: f64,
    pub high: f64,
    pub low: f64,
    pub volume: Option<f64>,
}

/// Why a symbol has nothing to show. Recovered at the API boundary and
/// rendered as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoData {
    NoSymbolSelected,
    NoSeriesForSymbol { symbol: String },
    EmptyWindow { symbol: String },
}

impl NoData {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoSymbolSelected => "no_symbol_selected",
            Self::NoSeriesForSymbol { .. } => "no_series_for_symbol",
            Self::EmptyWindow { .. } => "empty_window",
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::NoSymbolSelected => None,
            Self::NoSeriesForSymbol { symbol } | Self::EmptyWindow { symbol } => Some(symbol),
        }
    }

    pub fn placeholder(&self) -> String {
        match self {
            Self::NoSymbolSelected => "No asset selected".to_string(),
            Self::NoSeriesForSymbol { symbol } => format!("No data for {symbol}"),
            Self::EmptyWindow { .. } => "No data for the selected period".to_string(),
        }
    }
}

impl fmt::Display for NoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.placeholder())
    }
}

/// `(last - prior) / prior * 100`, saturating to 0 when `prior` is 0.
pub fn percent_change(last: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        return 0.0;
    }
    finite_or((last - prior) / prior * 100.0, 0.0)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn feature_or_zero(point: &TimePoint, column: &str) -> f64 {
    point
        .feature(column)
        .map(|v| finite_or(v, 0.0))
        .unwrap_or(0.0)
}

/// Snapshot of the window's latest point. A single-point window reports a
/// 0% change against itself.
pub fn derive_metrics(
    window: &Window<'_>,
    columns: &FeatureColumns,
) -> Result<MetricsSnapshot, NoData> {
    let Some(last) = window.last() else {
        return Err(NoData::EmptyWindow {
            symbol: window.symbol().to_string(),
        });
    };

    let last_value = finite_or(last.close, 0.0);
    let prior_value = window
        .second_to_last()
        .map(|p| finite_or(p.close, last_value))
        .unwrap_or(last_value);
    let change = percent_change(last_value, prior_value);

    Ok(MetricsSnapshot {
        symbol: window.symbol().to_string(),
        as_of_ms: last.timestamp_ms,
        last_value,
        prior_value,
        percent_change: change,
        direction: Direction::of(change),
        volatility: feature_or_zero(last, &columns.volatility),
        daily_return: feature_or_zero(last, &columns.daily_return),
        overnight_gap: feature_or_zero(last, &columns.overnight_gap),
        high: finite_or(last.high, last_value),
        low: finite_or(last.low, last_value),
        volume: last.volume.filter(|v| v.is_finite()),
    })
}
