//! Merge history and forecast into one date-ordered series.
//!
//! History keeps its own dates; forecast steps get consecutive calendar days
//! starting the day after the last valid historical date. Each record carries
//! `actual` or `forecast`, never both, so "not observed" and "not predicted"
//! stay distinct without NaN sentinels.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::series::RawPriceSeries;
use crate::error::ForecastError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRecord {
    pub index: usize,
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}

/// Counts of records discarded while building the historical part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReconcileStats {
    pub invalid_dates: usize,
    pub unfilled: usize,
    pub duplicate_dates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledSeries {
    records: Vec<SeriesRecord>,
    historical_len: usize,
    stats: ReconcileStats,
}

impl ReconciledSeries {
    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn historical_len(&self) -> usize {
        self.historical_len
    }

    pub fn forecast_len(&self) -> usize {
        self.records.len() - self.historical_len
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    pub fn last_historical_date(&self) -> Option<NaiveDate> {
        self.historical_len
            .checked_sub(1)
            .map(|i| self.records[i].date)
    }

    pub fn forecast_records(&self) -> &[SeriesRecord] {
        &self.records[self.historical_len..]
    }

    /// Min and max over every populated actual and forecast value.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.records
            .iter()
            .flat_map(|r| r.actual.into_iter().chain(r.forecast))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }
}

/// Parse the date spellings price sources use: `YYYY-MM-DD`, RFC 3339, or
/// `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

/// Build the combined series.
///
/// `filled` is `raw.forward_filled()`; `forecast` is already back on the
/// price scale. Records with an unparseable date or no filled price are
/// dropped; if nothing survives the call fails rather than inventing an
/// anchor date.
pub fn reconcile(
    raw: &RawPriceSeries,
    filled: &[Option<f64>],
    forecast: &[f64],
    horizon: usize,
) -> Result<ReconciledSeries, ForecastError> {
    if raw.is_empty() {
        return Err(ForecastError::DataUnavailable(
            "historical series is empty".to_string(),
        ));
    }

    let mut stats = ReconcileStats::default();
    let mut historical: Vec<(NaiveDate, f64)> = Vec::with_capacity(raw.len());
    for (point, price) in raw.points.iter().zip(filled.iter()) {
        let Some(date) = parse_date(&point.date) else {
            stats.invalid_dates += 1;
            continue;
        };
        let Some(price) = *price else {
            stats.unfilled += 1;
            continue;
        };
        historical.push((date, price));
    }

    if stats.invalid_dates > 0 {
        tracing::warn!(
            dropped = stats.invalid_dates,
            "dropped historical records with invalid dates"
        );
    }
    if stats.unfilled > 0 {
        tracing::warn!(
            dropped = stats.unfilled,
            "dropped leading historical records with no close price"
        );
    }

    if historical.is_empty() {
        return Err(if stats.invalid_dates == raw.len() {
            ForecastError::DateParseFailure(format!(
                "none of the {} historical dates could be parsed",
                raw.len()
            ))
        } else {
            ForecastError::DataUnavailable(
                "no historical record has both a valid date and a close price".to_string(),
            )
        });
    }

    // Stable sort, then keep the last observation for a repeated date.
    historical.sort_by_key(|(d, _)| *d);
    let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(historical.len());
    for (date, price) in historical {
        match deduped.last_mut() {
            Some(last) if last.0 == date => {
                last.1 = price;
                stats.duplicate_dates += 1;
            }
            _ => deduped.push((date, price)),
        }
    }
    if stats.duplicate_dates > 0 {
        tracing::warn!(
            collapsed = stats.duplicate_dates,
            "collapsed duplicate historical dates"
        );
    }

    let last_date = deduped
        .last()
        .map(|(d, _)| *d)
        .ok_or_else(|| ForecastError::DateParseFailure("no last historical date".to_string()))?;

    let future = future_dates(last_date, horizon)?;

    if forecast.len() != horizon {
        return Err(ForecastError::ForecastLengthMismatch {
            expected: horizon,
            actual: forecast.len(),
        });
    }

    let historical_len = deduped.len();
    let mut records: Vec<SeriesRecord> = deduped
        .into_iter()
        .map(|(date, price)| SeriesRecord {
            index: 0,
            date,
            actual: Some(price),
            forecast: None,
        })
        .chain(
            future
                .into_iter()
                .zip(forecast.iter())
                .map(|(date, &value)| SeriesRecord {
                    index: 0,
                    date,
                    actual: None,
                    forecast: Some(value),
                }),
        )
        .collect();

    records.sort_by_key(|r| r.date);
    for (i, r) in records.iter_mut().enumerate() {
        r.index = i;
    }

    Ok(ReconciledSeries {
        records,
        historical_len,
        stats,
    })
}

/// `horizon` consecutive days starting the day after `last`.
fn future_dates(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>, ForecastError> {
    (1..=horizon as u64)
        .map(|k| {
            last.checked_add_days(Days::new(k)).ok_or_else(|| {
                ForecastError::DateParseFailure(format!(
                    "last historical date {last} cannot be extended by {horizon} days"
                ))
            })
        })
        .collect()
}
