use tradelux::metrics::{derive_metrics, FeatureColumns, NoData};
use tradelux::model::{Period, Series, TimePoint, DAY_MS};
use tradelux::window::{cutoff_ms, select_window, select_window_by_code};

/// Irregular spacing (weekends skipped) so boundaries fall between rows.
fn trading_days(symbol: &str, n: i64) -> Series {
    let points = (0..n)
        .filter(|d| d % 7 < 5)
        .map(|d| TimePoint::from_close(d * DAY_MS + 21 * 3_600_000, 100.0 + d as f64))
        .collect();
    Series::new(symbol, points).expect("generated series is ordered")
}

#[test]
/// Every period returns a contiguous, in-order suffix whose rows all satisfy
/// the cutoff, and the row just before it does not.
fn window_is_exact_suffix_for_every_period() {
    let series = trading_days("AAPL", 2_000);
    let reference = 2_000 * DAY_MS;
    for period in Period::ALL {
        let w = select_window(&series, Some(period), reference);
        let cutoff = cutoff_ms(period, reference);
        let start = series.len() - w.len();

        assert_eq!(w.points(), &series.points()[start..], "{period}");
        assert!(w.points().iter().all(|p| p.timestamp_ms >= cutoff), "{period}");
        if start > 0 {
            assert!(series.points()[start - 1].timestamp_ms < cutoff, "{period}");
        }
    }
}

#[test]
fn unrecognized_period_is_identity() {
    let series = trading_days("AAPL", 40);
    let w = select_window(&series, Period::parse("max"), 0);
    assert_eq!(w.points(), series.points());
    let w = select_window_by_code(&series, "10y", i64::MAX);
    assert_eq!(w.len(), series.len());
}

#[test]
/// Scenario: one month back from d0 with every row older than d0-30d.
fn stale_series_yields_empty_window_and_no_data() {
    let d0 = 1_000 * DAY_MS;
    let series = Series::new(
        "AAPL",
        vec![
            TimePoint::from_close(d0 - 45 * DAY_MS, 10.0),
            TimePoint::from_close(d0 - 31 * DAY_MS, 11.0),
        ],
    )
    .unwrap();
    let w = select_window(&series, Some(Period::OneMonth), d0);
    assert!(w.is_empty());
    assert_eq!(
        derive_metrics(&w, &FeatureColumns::default()),
        Err(NoData::EmptyWindow {
            symbol: "AAPL".to_string()
        })
    );
}

#[test]
/// The anchor is the reference time, not the series' last row.
fn window_anchors_on_reference_time_not_last_row() {
    let series = trading_days("AAPL", 100);
    let last = series.last().unwrap().timestamp_ms;
    let near = select_window(&series, Some(Period::OneMonth), last);
    let later = select_window(&series, Some(Period::OneMonth), last + 20 * DAY_MS);
    assert!(later.len() < near.len());
}
