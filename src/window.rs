//! Lookback filtering over a stored series.
//!
//! The window is anchored at the caller's reference time (wall-clock now in
//! the API), never at the series' own last timestamp, so a stale series can
//! legitimately produce an empty window.

use crate::model::{Period, Series, TimePoint};

/// Contiguous suffix of a series that falls inside a lookback period.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    symbol: &'a str,
    points: &'a [TimePoint],
    period: Option<Period>,
    cutoff_ms: Option<i64>,
}

impl<'a> Window<'a> {
    /// The whole series, unfiltered.
    pub fn whole(series: &'a Series) -> Self {
        Self {
            symbol: series.symbol(),
            points: series.points(),
            period: None,
            cutoff_ms: None,
        }
    }

    pub fn symbol(&self) -> &'a str {
        self.symbol
    }

    pub fn points(&self) -> &'a [TimePoint] {
        self.points
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn cutoff_ms(&self) -> Option<i64> {
        self.cutoff_ms
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&'a TimePoint> {
        self.points.last()
    }

    pub fn second_to_last(&self) -> Option<&'a TimePoint> {
        self.points.len().checked_sub(2).map(|i| &self.points[i])
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

pub fn cutoff_ms(period: Period, reference_ms: i64) -> i64 {
    reference_ms.saturating_sub(period.duration_ms())
}

/// Restricts `series` to points with `timestamp_ms >= reference_ms - period`.
/// `None` (an unrecognized period) returns the series unchanged.
pub fn select_window(series: &Series, period: Option<Period>, reference_ms: i64) -> Window<'_> {
    let Some(period) = period else {
        return Window::whole(series);
    };
    let cutoff = cutoff_ms(period, reference_ms);
    let points = series.points();
    let start = points.partition_point(|p| p.timestamp_ms < cutoff);
    Window {
        symbol: series.symbol(),
        points: &points[start..],
        period: Some(period),
        cutoff_ms: Some(cutoff),
    }
}

/// Same as [`select_window`] but takes the raw period code from a request.
pub fn select_window_by_code<'a>(
    series: &'a Series,
    period_code: &str,
    reference_ms: i64,
) -> Window<'a> {
    let period = Period::parse(period_code);
    if period.is_none() {
        tracing::debug!(period = period_code, "Unrecognized period, window left unfiltered");
    }
    select_window(series, period, reference_ms)
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
