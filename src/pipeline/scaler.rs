use serde::Serialize;

use crate::error::ForecastError;

/// Min/max bounds fitted on one request's close prices.
///
/// Maps prices into [0, 1] and back. The same instance must scale the model
/// input and invert the model output; it is never refit in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalerState {
    pub min: f64,
    pub max: f64,
}

impl ScalerState {
    /// Fit bounds over `values`.
    ///
    /// Fails with `DataUnavailable` on an empty slice and `DegenerateScale`
    /// when every value is equal.
    pub fn fit(values: &[f64]) -> Result<Self, ForecastError> {
        if values.is_empty() {
            return Err(ForecastError::DataUnavailable(
                "no close prices to fit the scaler".to_string(),
            ));
        }
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if max <= min {
            return Err(ForecastError::DegenerateScale { value: min });
        }
        Ok(Self { min, max })
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, raw: f64) -> f64 {
        (raw - self.min) / self.span()
    }

    pub fn inverse(&self, normalized: f64) -> f64 {
        normalized * self.span() + self.min
    }

    pub fn transform_all(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&v| self.transform(v)).collect()
    }

    pub fn inverse_all(&self, normalized: &[f64]) -> Vec<f64> {
        normalized.iter().map(|&v| self.inverse(v)).collect()
    }
}
