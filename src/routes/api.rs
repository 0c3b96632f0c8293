use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ForecastError};
use crate::source::{HistoryPeriod, Ticker};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    ticker: String,
    #[serde(default = "default_period")]
    period: String,
}

fn default_period() -> String {
    HistoryPeriod::SixMonths.as_str().to_string()
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickers", get(api_tickers))
        .route("/api/forecast", post(api_forecast))
}

/// GET /api/tickers — choices the form offers.
async fn api_tickers(State(state): State<Arc<AppState>>) -> Json<Value> {
    let periods: Vec<Value> = HistoryPeriod::FORM_CHOICES
        .iter()
        .map(|p| json!({ "value": p.as_str(), "label": p.label() }))
        .collect();
    Json(json!({
        "tickers": state.config.tickers,
        "periods": periods,
    }))
}

/// POST /api/forecast — reconciled series as JSON.
async fn api_forecast(
    State(state): State<Arc<AppState>>,
    q: Result<Json<ForecastQuery>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(q) = q.map_err(ForecastError::from)?;
    let ticker = Ticker::parse(&q.ticker)?;
    let period = HistoryPeriod::parse(&q.period)?;

    let outcome = state.pipeline.run(&ticker, period).await.inspect_err(|e| {
        tracing::error!(%ticker, %period, "forecast failed: {e}");
    })?;
    let series = &outcome.series;

    Ok(Json(json!({
        "ticker": outcome.ticker,
        "period": outcome.period,
        "lookback": state.pipeline.lookback(),
        "horizon": state.pipeline.horizon(),
        "scaler": outcome.scaler,
        "historical_len": series.historical_len(),
        "forecast_len": series.forecast_len(),
        "last_historical_date": series.last_historical_date(),
        "dropped": series.stats(),
        "records": series.records(),
    })))
}
