use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::model::TimePoint;

pub struct YahooChartSource {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_candles(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<TimePoint>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let root: Value = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .context("yahoo chart HTTP failed")?
            .error_for_status()
            .context("yahoo chart returned error status")?
            .json()
            .await
            .context("yahoo chart JSON parse failed")?;
        parse_chart(&root)
    }
}

fn f64_at(values: Option<&Value>, idx: usize) -> Option<f64> {
    values
        .and_then(Value::as_array)
        .and_then(|a| a.get(idx))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Parses a `/v8/finance/chart` payload. Bars without a close are dropped.
pub fn parse_chart(root: &Value) -> Result<Vec<TimePoint>> {
    let chart = root.get("chart").context("yahoo chart payload missing 'chart'")?;
    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("yahoo chart error: {}", msg);
    }
    let Some(result) = chart
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
    else {
        bail!("yahoo chart payload has no result");
    };

    let timestamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(Value::as_array)
        .and_then(|q| q.first());

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(ts_sec) = ts.as_i64() else {
            continue;
        };
        let Some(close) = f64_at(quote.and_then(|q| q.get("close")), i) else {
            continue;
        };
        let open = f64_at(quote.and_then(|q| q.get("open")), i).unwrap_or(close);
        let high = f64_at(quote.and_then(|q| q.get("high")), i).unwrap_or(open.max(close));
        let low = f64_at(quote.and_then(|q| q.get("low")), i).unwrap_or(open.min(close));
        let mut point = TimePoint::new(ts_sec.saturating_mul(1_000), open, high, low, close);
        point.volume = f64_at(quote.and_then(|q| q.get("volume")), i);
        candles.push(point);
    }
    candles.sort_by_key(|c| c.timestamp_ms);
    Ok(candles)
}
