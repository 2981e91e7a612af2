use serde::Serialize;

use crate::error::AppError;
use crate::model::time_point::TimePoint;

/// Ordered points for exactly one symbol. Timestamps strictly increase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    symbol: String,
    points: Vec<TimePoint>,
}

impl Series {
    /// Builds a series from points that are already in order.
    pub fn new(symbol: impl Into<String>, points: Vec<TimePoint>) -> Result<Self, AppError> {
        let symbol = symbol.into();
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].timestamp_ms <= w[0].timestamp_ms)
        {
            return Err(AppError::UnorderedSeries {
                symbol,
                index: index + 1,
            });
        }
        Ok(Self { symbol, points })
    }

    /// Sorts by timestamp; when two rows share a timestamp the later row wins.
    pub fn from_unsorted(symbol: impl Into<String>, mut points: Vec<TimePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp_ms);
        let mut out: Vec<TimePoint> = Vec::with_capacity(points.len());
        for p in points {
            match out.last_mut() {
                Some(prev) if prev.timestamp_ms == p.timestamp_ms => *prev = p,
                _ => out.push(p),
            }
        }
        Self {
            symbol: symbol.into(),
            points: out,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}
