use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::market_data::MarketDataConfig;
use crate::metrics::FeatureColumns;
use crate::predictor::SignalConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub signal: SignalSection,
    #[serde(default)]
    pub metrics: FeatureColumns,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub symbols: SymbolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub prices_csv: PathBuf,
    #[serde(default)]
    pub features_csv: Option<PathBuf>,
    pub refresh_interval: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalSection {
    #[serde(flatten)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub model_url: Option<String>,
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,
    #[serde(default = "default_ewma_alpha")]
    pub ewma_alpha: f64,
}

fn default_model_timeout_ms() -> u64 {
    5_000
}

fn default_ewma_alpha() -> f64 {
    0.1
}

impl Default for SignalSection {
    fn default() -> Self {
        Self {
            signal: SignalConfig::default(),
            model_url: None,
            model_timeout_ms: default_model_timeout_ms(),
            ewma_alpha: default_ewma_alpha(),
        }
    }
}

impl SignalSection {
    pub fn model_url(&self) -> Option<&str> {
        self.model_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolsConfig {
    #[serde(default)]
    pub default: Option<String>,
    /// Display names keyed by ticker; unknown tickers display as themselves.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl SymbolsConfig {
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.names.get(symbol).map(String::as_str).unwrap_or(symbol)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Parse an interval string (e.g. "30s", "1m", "1h", "1d", "1w") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let Some(last) = s.chars().last().filter(|_| s.chars().count() >= 2) else {
        bail!("invalid interval '{}': expected format like '1m'", s);
    };

    let (num_str, suffix) = s.split_at(s.len() - last.len_utf8());
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl DataConfig {
    pub fn refresh_interval_ms(&self) -> Result<u64> {
        parse_interval_ms(&self.refresh_interval)
    }
}

fn config_path() -> PathBuf {
    std::env::var("TRADELUX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from_path(&config_path())?;
        config.market_data.alpha_vantage_api_key = std::env::var("ALPHAVANTAGE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("invalid config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.data
            .refresh_interval_ms()
            .context("data.refresh_interval is invalid")?;
        if self.signal.signal.window_len < 2 {
            bail!(
                "signal.window_len must be >= 2, got {}",
                self.signal.signal.window_len
            );
        }
        if !self.signal.signal.confidence_scale.is_finite()
            || !self.signal.signal.buy_threshold.is_finite()
        {
            bail!("signal.confidence_scale and signal.buy_threshold must be finite");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_toml_uses_defaults() {
        let toml_str = r#"
[data]
prices_csv = "Data/ALL_CLEANED.csv"
refresh_interval = "5m"

[server]
bind_addr = "127.0.0.1:7860"

[logging]
level = "debug"
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert!(config.data.features_csv.is_none());
        assert_eq!(config.signal.signal, SignalConfig::default());
        assert_eq!(config.metrics, FeatureColumns::default());
        assert_eq!(config.market_data.attempts, 2);
        assert!(config.signal.model_url().is_none());
    }

    #[test]
    fn parse_interval_valid() {
        assert_eq!(parse_interval_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_interval_ms("2h").unwrap(), 7_200_000);
        assert_eq!(parse_interval_ms("1w").unwrap(), 604_800_000);
    }

    #[test]
    fn parse_interval_rejects_invalid_inputs() {
        assert!(parse_interval_ms("").is_err());
        assert!(parse_interval_ms("m").is_err());
        assert!(parse_interval_ms("0m").is_err());
        assert!(parse_interval_ms("1x").is_err());
        assert!(parse_interval_ms("5é").is_err());
        assert!(parse_interval_ms("é").is_err());
    }
}
