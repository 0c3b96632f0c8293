use serde::{Deserialize, Serialize};

/// One daily bar as delivered by the price source.
///
/// `date` is kept as text until reconciliation so that a malformed date only
/// drops its own record instead of failing the fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrice {
    pub date: String,
    pub close: Option<f64>,
}

impl RawPrice {
    pub fn new(date: impl Into<String>, close: Option<f64>) -> Self {
        Self {
            date: date.into(),
            close,
        }
    }
}

/// Date-ascending close prices for one ticker, gaps allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceSeries {
    pub points: Vec<RawPrice>,
}

impl RawPriceSeries {
    pub fn new(points: Vec<RawPrice>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close prices with gaps filled from the most recent valid value.
    ///
    /// Non-finite closes count as gaps. The result has one entry per point;
    /// only a leading run of gaps can stay `None`.
    pub fn forward_filled(&self) -> Vec<Option<f64>> {
        let mut last: Option<f64> = None;
        self.points
            .iter()
            .map(|p| {
                if let Some(c) = p.close.filter(|c| c.is_finite()) {
                    last = Some(c);
                }
                last
            })
            .collect()
    }
}
