use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregate::{aggregate_metrics, aggregate_metrics_detailed, metrics_for_symbol, symbol_view};
use crate::api::{ApiError, AppState};
use crate::error::AppError;
use crate::metrics::NoData;
use crate::model::Period;
use crate::predictor::recommend;
use crate::store::normalize_symbol;
use crate::window::{now_ms, select_window};

// ── Query params ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SymbolPeriodQuery {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    #[serde(default)]
    pub symbols: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveQuery {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default = "default_live_interval")]
    pub interval: String,
    #[serde(default = "default_live_range")]
    pub range: String,
}

fn default_live_interval() -> String {
    "1m".to_string()
}

fn default_live_range() -> String {
    "1d".to_string()
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Missing period means the default lookback; an unknown code means no
/// filtering.
fn resolve_period(raw: Option<&str>) -> Option<Period> {
    match raw {
        None => Some(Period::default()),
        Some(code) => Period::parse(code),
    }
}

fn period_label(period: Option<Period>) -> Value {
    match period {
        Some(p) => json!(p.code()),
        None => Value::Null,
    }
}

fn no_data_body(no_data: &NoData) -> Value {
    json!({
        "status": "no_data",
        "reason": no_data.reason(),
        "symbol": no_data.symbol(),
        "message": no_data.placeholder(),
    })
}

fn unavailable_body(symbol: &str, message: &str) -> Value {
    json!({
        "status": "unavailable",
        "symbol": symbol,
        "message": message,
    })
}

fn required_symbol(raw: Option<&str>) -> Result<String, ApiError> {
    raw.map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'symbol' parameter".to_string()))
}

// ── Route definitions ────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/symbols", get(api_symbols))
        .route("/api/periods", get(api_periods))
        .route("/api/view", get(api_view))
        .route("/api/series", get(api_series))
        .route("/api/metrics", get(api_metrics))
        .route("/api/metrics/batch", get(api_metrics_batch))
        .route("/api/signal", get(api_signal))
        .route("/api/live", get(api_live))
}

// ── Handlers ─────────────────────────────────────────────────────────────

pub async fn api_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.snapshot();
    Json(json!({
        "ok": true,
        "symbols": store.available_symbols().len(),
        "features_table": store.has_features_table(),
        "loaded_at_ms": store.loaded_at_ms(),
        "model": state.predictor.name(),
    }))
}

pub async fn api_symbols(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.snapshot();
    let symbols: Vec<Value> = store
        .available_symbols()
        .iter()
        .enumerate()
        .map(|(id, s)| {
            json!({
                "symbol": s,
                "name": state.symbols.display_name(s),
                "id": id,
            })
        })
        .collect();
    Json(json!({
        "symbols": symbols,
        "default": state.symbols.default.as_deref().map(normalize_symbol),
    }))
}

pub async fn api_periods() -> Json<Value> {
    let periods: Vec<Value> = Period::ALL
        .iter()
        .map(|p| {
            json!({
                "code": p.code(),
                "label": p.label(),
                "days": p.days(),
                "chart_interval": p.chart_interval(),
            })
        })
        .collect();
    Json(json!({ "periods": periods, "default": Period::default().code() }))
}

/// Chart candles and metrics together, as the dashboard page consumes them.
pub async fn api_view(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolPeriodQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store.snapshot();
    let period = resolve_period(q.period.as_deref());
    let view = match symbol_view(
        &store,
        q.symbol.as_deref(),
        period,
        now_ms(),
        &state.columns,
    ) {
        Ok(v) => v,
        Err(no_data) => return Ok(Json(no_data_body(&no_data))),
    };
    let metrics = match &view.metrics {
        Ok(snapshot) => serde_json::to_value(snapshot)?,
        Err(no_data) => no_data_body(no_data),
    };
    Ok(Json(json!({
        "status": "ok",
        "symbol": view.symbol,
        "name": state.symbols.display_name(&view.symbol),
        "period": period_label(period),
        "chart_interval": period.map(Period::chart_interval),
        "candles": view.candles.points(),
        "metrics": metrics,
    })))
}

pub async fn api_series(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolPeriodQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = required_symbol(q.symbol.as_deref())?;
    let store = state.store.snapshot();
    let period = resolve_period(q.period.as_deref());
    let Some(series) = store.price_series(&symbol) else {
        return Ok(Json(no_data_body(&NoData::NoSeriesForSymbol { symbol })));
    };
    let window = select_window(series, period, now_ms());
    if window.is_empty() {
        return Ok(Json(no_data_body(&NoData::EmptyWindow { symbol })));
    }
    Ok(Json(json!({
        "status": "ok",
        "symbol": symbol,
        "period": period_label(period),
        "cutoff_ms": window.cutoff_ms(),
        "candles": window.points(),
    })))
}

pub async fn api_metrics(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolPeriodQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = required_symbol(q.symbol.as_deref())?;
    let store = state.store.snapshot();
    let period = resolve_period(q.period.as_deref());
    match metrics_for_symbol(&store, &symbol, period, now_ms(), &state.columns) {
        Ok(snapshot) => Ok(Json(json!({
            "status": "ok",
            "period": period_label(period),
            "metrics": snapshot,
        }))),
        Err(no_data) => Ok(Json(no_data_body(&no_data))),
    }
}

pub async fn api_metrics_batch(
    State(state): State<Arc<AppState>>,
    Query(q): Query<BatchQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbols: Vec<String> = q
        .symbols
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(ApiError::BadRequest(
            "missing 'symbols' parameter".to_string(),
        ));
    }
    let store = state.store.snapshot();
    let period = resolve_period(q.period.as_deref());
    let reference_ms = now_ms();

    if !q.detailed {
        let metrics = aggregate_metrics(&store, &symbols, period, reference_ms, &state.columns);
        return Ok(Json(json!({
            "period": period_label(period),
            "metrics": metrics,
        })));
    }

    let mut metrics = Vec::new();
    let mut skipped = Vec::new();
    for (symbol, outcome) in
        aggregate_metrics_detailed(&store, &symbols, period, reference_ms, &state.columns)
    {
        match outcome {
            Ok(snapshot) => metrics.push(serde_json::to_value(snapshot)?),
            Err(no_data) => skipped.push(json!({ "symbol": symbol, "reason": no_data.reason() })),
        }
    }
    Ok(Json(json!({
        "period": period_label(period),
        "metrics": metrics,
        "skipped": skipped,
    })))
}

pub async fn api_signal(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = required_symbol(q.symbol.as_deref())?;
    let (closes, symbol_id, as_of_ms) = {
        let store = state.store.snapshot();
        let (Some(series), Some(symbol_id)) = (store.price_series(&symbol), store.symbol_id(&symbol))
        else {
            return Ok(Json(no_data_body(&NoData::NoSeriesForSymbol { symbol })));
        };
        (
            series.closes(),
            symbol_id,
            series.last().map(|p| p.timestamp_ms),
        )
    };

    let recommendation = match recommend(
        &state.predictor,
        &state.signal,
        &symbol,
        symbol_id,
        &closes,
        as_of_ms,
    )
    .await
    {
        Ok(r) => r,
        Err(e @ AppError::InsufficientHistory { .. }) => {
            return Ok(Json(json!({
                "status": "no_data",
                "reason": "insufficient_history",
                "symbol": symbol,
                "message": e.to_string(),
            })));
        }
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "Prediction failed");
            return Ok(Json(unavailable_body(&symbol, "Prediction unavailable")));
        }
    };
    let performance = state
        .predictor
        .performance(&closes, state.signal.window_len);

    Ok(Json(json!({
        "status": "ok",
        "recommendation": recommendation,
        "performance": performance,
    })))
}

pub async fn api_live(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LiveQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = required_symbol(q.symbol.as_deref())?;
    match state
        .market
        .fetch_latest_candles(&symbol, &q.range, &q.interval)
        .await
    {
        Ok(candles) if candles.is_empty() => Ok(Json(unavailable_body(&symbol, "No data"))),
        Ok(candles) => Ok(Json(json!({
            "status": "ok",
            "symbol": symbol,
            "interval": q.interval,
            "candles": candles,
        }))),
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "Live fetch failed");
            Ok(Json(unavailable_body(&symbol, "Data unavailable")))
        }
    }
}
