use serde::Serialize;

use crate::error::ForecastError;

/// The last `lookback` normalized closes, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputWindow {
    values: Vec<f64>,
}

impl InputWindow {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values narrowed to the FP32 tensor type the model expects.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Take the tail of `normalized` as the model input.
///
/// Fewer than `lookback` points is `DataUnavailable`. A series long enough
/// for the window but too short for a single (input, target) training pair
/// still produces a window, with a warning.
pub fn build_input_window(
    normalized: &[f64],
    lookback: usize,
    horizon: usize,
) -> Result<InputWindow, ForecastError> {
    if normalized.len() < lookback {
        return Err(ForecastError::DataUnavailable(format!(
            "need at least {lookback} closes for the input window, got {}",
            normalized.len()
        )));
    }
    if training_pairs(normalized, lookback, horizon).next().is_none() {
        tracing::warn!(
            points = normalized.len(),
            needed = lookback + horizon,
            "history too short for a full lookback+horizon span"
        );
    }
    Ok(InputWindow {
        values: normalized[normalized.len() - lookback..].to_vec(),
    })
}

/// Sliding (input, target) pairs over the history: input is `lookback`
/// values, target is the `horizon` values that follow it.
pub fn training_pairs(
    series: &[f64],
    lookback: usize,
    horizon: usize,
) -> impl Iterator<Item = (&[f64], &[f64])> {
    let end = (series.len() + 1).saturating_sub(horizon);
    (lookback..end.max(lookback)).map(move |i| (&series[i - lookback..i], &series[i..i + horizon]))
}
