use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::model::TimePoint;
use crate::store::parse_timestamp_ms;

/// Maps a chart interval to Alpha Vantage's intraday interval name.
pub fn map_interval(interval: &str) -> Option<&'static str> {
    match interval {
        "1m" => Some("1min"),
        "5m" => Some("5min"),
        "15m" => Some("15min"),
        "60m" => Some("60min"),
        _ => None,
    }
}

pub struct AlphaVantageSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageSource {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn get_intraday(&self, symbol: &str, interval: &str) -> Result<Vec<TimePoint>> {
        let av_interval = map_interval(interval).unwrap_or("1min");
        let url = format!("{}/query", self.base_url);
        let root: Value = self
            .http
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", av_interval),
                ("apikey", self.api_key.as_str()),
                ("outputsize", "compact"),
            ])
            .send()
            .await
            .context("alpha vantage HTTP failed")?
            .error_for_status()
            .context("alpha vantage returned error status")?
            .json()
            .await
            .context("alpha vantage JSON parse failed")?;
        parse_intraday(&root, av_interval)
    }
}

fn field(bar: &Value, key: &str) -> Result<f64> {
    bar.get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("alpha vantage bar missing '{}'", key))?
        .trim()
        .parse::<f64>()
        .with_context(|| format!("alpha vantage bar field '{}' is not a number", key))
}

/// Parses a `TIME_SERIES_INTRADAY` payload. A payload without the expected
/// series key (rate limit notes, unknown symbols) is an error.
pub fn parse_intraday(root: &Value, av_interval: &str) -> Result<Vec<TimePoint>> {
    let key = format!("Time Series ({})", av_interval);
    let Some(series) = root.get(&key).and_then(Value::as_object) else {
        let keys: Vec<&str> = root
            .as_object()
            .map(|o| o.keys().take(3).map(String::as_str).collect())
            .unwrap_or_default();
        bail!("alpha vantage invalid response, keys: {:?}", keys);
    };

    let mut candles = Vec::with_capacity(series.len());
    for (ts, bar) in series {
        let timestamp_ms = parse_timestamp_ms(ts)?;
        let mut point = TimePoint::new(
            timestamp_ms,
            field(bar, "1. open")?,
            field(bar, "2. high")?,
            field(bar, "3. low")?,
            field(bar, "4. close")?,
        );
        point.volume = field(bar, "5. volume").ok();
        candles.push(point);
    }
    candles.sort_by_key(|c| c.timestamp_ms);
    Ok(candles)
}
