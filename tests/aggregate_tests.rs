use tradelux::aggregate::{aggregate_metrics, aggregate_metrics_detailed, symbol_view};
use tradelux::metrics::{FeatureColumns, NoData};
use tradelux::model::{Period, Series, TimePoint, DAY_MS};
use tradelux::store::{SeriesStore, SymbolTable};

const NOW: i64 = 20_000 * DAY_MS;

fn recent(symbol: &str, closes: &[f64]) -> Series {
    let n = closes.len() as i64;
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, c)| TimePoint::from_close(NOW - (n - i as i64) * DAY_MS, *c))
        .collect();
    Series::new(symbol, points).expect("ordered test series")
}

fn store() -> SeriesStore {
    let prices = SymbolTable::from_series(vec![
        recent("AAPL", &[100.0, 110.0]),
        recent("MSFT", &[300.0, 297.0]),
        Series::new("OLD", vec![TimePoint::from_close(DAY_MS, 1.0)]).unwrap(),
    ]);
    SeriesStore::new(prices, None, NOW)
}

#[test]
/// Scenario: ["AAPL", "ZZZZ"] where ZZZZ has no series.
fn aggregate_skips_missing_symbols() {
    let out = aggregate_metrics(
        &store(),
        &["AAPL", "ZZZZ"],
        Some(Period::OneMonth),
        NOW,
        &FeatureColumns::default(),
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].symbol, "AAPL");
    assert!((out[0].percent_change - 10.0).abs() < 1e-9);
}

#[test]
fn aggregate_skips_out_of_window_symbols_and_keeps_order() {
    let out = aggregate_metrics(
        &store(),
        &["msft", "OLD", "AAPL"],
        Some(Period::OneMonth),
        NOW,
        &FeatureColumns::default(),
    );
    let symbols: Vec<&str> = out.iter().map(|m| m.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["MSFT", "AAPL"]);
    assert!((out[0].percent_change + 1.0).abs() < 1e-9);
}

#[test]
fn detailed_aggregate_distinguishes_missing_from_empty() {
    let out = aggregate_metrics_detailed(
        &store(),
        &["ZZZZ", "OLD"],
        Some(Period::OneMonth),
        NOW,
        &FeatureColumns::default(),
    );
    assert_eq!(
        out[0].1,
        Err(NoData::NoSeriesForSymbol {
            symbol: "ZZZZ".to_string()
        })
    );
    assert_eq!(
        out[1].1,
        Err(NoData::EmptyWindow {
            symbol: "OLD".to_string()
        })
    );
}

#[test]
fn symbol_view_reports_missing_symbol_before_window() {
    let store = store();
    let err = symbol_view(&store, Some("ZZZZ"), None, NOW, &FeatureColumns::default())
        .unwrap_err();
    assert_eq!(err.placeholder(), "No data for ZZZZ");

    let err = symbol_view(
        &store,
        Some("OLD"),
        Some(Period::FiveYears),
        NOW,
        &FeatureColumns::default(),
    )
    .unwrap_err();
    assert_eq!(err.placeholder(), "No data for the selected period");
}

#[test]
fn symbol_view_returns_chart_and_metrics() {
    let store = store();
    let view = symbol_view(
        &store,
        Some("AAPL"),
        Some(Period::SixMonths),
        NOW,
        &FeatureColumns::default(),
    )
    .unwrap();
    assert_eq!(view.candles.len(), 2);
    assert_eq!(view.metrics.unwrap().last_value, 110.0);
}
