pub mod reconcile;
pub mod scaler;
pub mod series;
pub mod window;

use serde::Serialize;
use std::sync::Arc;

use crate::error::ForecastError;
use crate::inference::InferenceClient;
use crate::source::{HistoryPeriod, PriceSource, Ticker};
use reconcile::{reconcile, ReconciledSeries};
use scaler::ScalerState;
use window::build_input_window;

/// Input steps the model consumes.
pub const LOOKBACK: usize = 60;
/// Steps the model predicts.
pub const HORIZON: usize = 30;

/// Everything a caller needs to render or serialize one forecast.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastOutcome {
    pub ticker: Ticker,
    pub period: HistoryPeriod,
    pub scaler: ScalerState,
    pub series: ReconciledSeries,
}

/// fetch → fill → scale → window → infer → inverse → reconcile.
///
/// Holds no per-request state; the scaler is fitted fresh on every run.
pub struct ForecastPipeline {
    source: Arc<dyn PriceSource>,
    model: Arc<dyn InferenceClient>,
    lookback: usize,
    horizon: usize,
}

impl ForecastPipeline {
    pub fn new(source: Arc<dyn PriceSource>, model: Arc<dyn InferenceClient>) -> Self {
        Self {
            source,
            model,
            lookback: LOOKBACK,
            horizon: HORIZON,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub async fn run(
        &self,
        ticker: &Ticker,
        period: HistoryPeriod,
    ) -> Result<ForecastOutcome, ForecastError> {
        let raw = self.source.fetch(ticker, period).await?;
        if raw.is_empty() {
            tracing::error!(%ticker, %period, "no data returned");
        } else {
            tracing::debug!(%ticker, %period, points = raw.len(), "fetched history");
        }

        let filled = raw.forward_filled();
        let closes: Vec<f64> = filled.iter().flatten().copied().collect();
        if closes.is_empty() {
            return Err(ForecastError::DataUnavailable(format!(
                "no close prices for {ticker} over {period}"
            )));
        }
        if closes.len() < filled.len() {
            tracing::warn!(
                %ticker,
                missing = filled.len() - closes.len(),
                "history starts with missing closes"
            );
        }

        let scaler = ScalerState::fit(&closes)?;
        tracing::debug!(min = scaler.min, max = scaler.max, "fitted scaler");
        let normalized = scaler.transform_all(&closes);

        let window = build_input_window(&normalized, self.lookback, self.horizon)?;
        let predicted = self.model.predict(&window).await?;
        tracing::debug!(%ticker, steps = predicted.len(), "model returned forecast");

        let forecast = scaler.inverse_all(&predicted);
        let series = reconcile(&raw, &filled, &forecast, self.horizon)?;
        tracing::info!(
            %ticker,
            %period,
            historical = series.historical_len(),
            forecast = series.forecast_len(),
            "forecast reconciled"
        );

        Ok(ForecastOutcome {
            ticker: ticker.clone(),
            period,
            scaler,
            series,
        })
    }
}
