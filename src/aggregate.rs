//! Per-symbol request flows over a store snapshot.

use crate::metrics::{derive_metrics, FeatureColumns, MetricsSnapshot, NoData};
use crate::model::Period;
use crate::store::{normalize_symbol, SeriesStore};
use crate::window::{select_window, Window};

/// Metrics for one symbol from the store's metrics table.
pub fn metrics_for_symbol(
    store: &SeriesStore,
    symbol: &str,
    period: Option<Period>,
    reference_ms: i64,
    columns: &FeatureColumns,
) -> Result<MetricsSnapshot, NoData> {
    let Some(series) = store.metrics_series(symbol) else {
        return Err(NoData::NoSeriesForSymbol {
            symbol: normalize_symbol(symbol),
        });
    };
    let window = select_window(series, period, reference_ms);
    derive_metrics(&window, columns)
}

/// One outcome per requested symbol, in request order.
pub fn aggregate_metrics_detailed<S: AsRef<str>>(
    store: &SeriesStore,
    symbols: &[S],
    period: Option<Period>,
    reference_ms: i64,
    columns: &FeatureColumns,
) -> Vec<(String, Result<MetricsSnapshot, NoData>)> {
    symbols
        .iter()
        .map(|s| {
            let symbol = normalize_symbol(s.as_ref());
            let outcome = metrics_for_symbol(store, &symbol, period, reference_ms, columns);
            (symbol, outcome)
        })
        .collect()
}

/// Snapshots for every symbol that has data in the window. Symbols without
/// a series or with an empty window are left out.
pub fn aggregate_metrics<S: AsRef<str>>(
    store: &SeriesStore,
    symbols: &[S],
    period: Option<Period>,
    reference_ms: i64,
    columns: &FeatureColumns,
) -> Vec<MetricsSnapshot> {
    aggregate_metrics_detailed(store, symbols, period, reference_ms, columns)
        .into_iter()
        .filter_map(|(symbol, outcome)| match outcome {
            Ok(snapshot) => Some(snapshot),
            Err(reason) => {
                tracing::debug!(symbol = %symbol, reason = reason.reason(), "Skipping symbol in aggregate");
                None
            }
        })
        .collect()
}

/// Chart window plus metrics for the dashboard's selected symbol.
#[derive(Debug)]
pub struct SymbolView<'a> {
    pub symbol: String,
    pub candles: Window<'a>,
    pub metrics: Result<MetricsSnapshot, NoData>,
}

/// Chart and metrics for one symbol. Missing symbol, missing price series
/// and an empty price window short-circuit; metrics failures are carried in
/// the view next to the chart.
pub fn symbol_view<'a>(
    store: &'a SeriesStore,
    symbol: Option<&str>,
    period: Option<Period>,
    reference_ms: i64,
    columns: &FeatureColumns,
) -> Result<SymbolView<'a>, NoData> {
    let symbol = match symbol.map(normalize_symbol) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(NoData::NoSymbolSelected),
    };
    let Some(series) = store.price_series(&symbol) else {
        return Err(NoData::NoSeriesForSymbol { symbol });
    };
    let candles = select_window(series, period, reference_ms);
    if candles.is_empty() {
        return Err(NoData::EmptyWindow { symbol });
    }
    let metrics = metrics_for_symbol(store, &symbol, period, reference_ms, columns);
    Ok(SymbolView {
        symbol,
        candles,
        metrics,
    })
}
