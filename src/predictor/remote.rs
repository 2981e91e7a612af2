use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    closes: &'a [f64],
    symbol_id: usize,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: f64,
}

/// Client for an externally hosted sequence model.
///
/// POSTs `{"closes": [...], "symbol_id": n}` and reads `{"prediction": x}`.
pub struct RemotePredictor {
    http: reqwest::Client,
    url: String,
}

impl RemotePredictor {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build model HTTP client")?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub async fn predict(&self, closes: &[f64], symbol_id: usize) -> Result<f64> {
        let resp: PredictResponse = self
            .http
            .post(&self.url)
            .json(&PredictRequest { closes, symbol_id })
            .send()
            .await
            .context("model predict HTTP failed")?
            .error_for_status()
            .context("model predict returned error status")?
            .json()
            .await
            .context("model predict JSON parse failed")?;
        Ok(resp.prediction)
    }
}
