//! Daily close history from the Yahoo Finance chart API.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ForecastError;
use crate::pipeline::series::{RawPrice, RawPriceSeries};

/// Lookback period offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl HistoryPeriod {
    /// Periods listed on the form, in display order.
    pub const FORM_CHOICES: [HistoryPeriod; 2] = [HistoryPeriod::SixMonths, HistoryPeriod::OneYear];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SixMonths => "6 months",
            Self::OneYear => "1 year",
            Self::TwoYears => "2 years",
            Self::FiveYears => "5 years",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ForecastError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            other => Err(ForecastError::BadRequest(format!(
                "unknown period: {other:?} (expected 6mo, 1y, 2y or 5y)"
            ))),
        }
    }
}

impl std::fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-cased, validated ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, ForecastError> {
        let t = raw.trim().to_ascii_uppercase();
        let valid_chars = t
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
        if t.is_empty() || t.len() > 12 || !valid_chars {
            return Err(ForecastError::BadRequest(format!("invalid ticker: {raw:?}")));
        }
        Ok(Self(t))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can produce a daily close series for a ticker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch history. An unknown ticker yields an empty series, not an error.
    async fn fetch(
        &self,
        ticker: &Ticker,
        period: HistoryPeriod,
    ) -> Result<RawPriceSeries, ForecastError>;
}

// ── Yahoo chart API wire types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC; bars are dated in exchange-local time.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance chart endpoint client.
pub struct YahooSource {
    http: Client,
    base_url: String,
}

impl YahooSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) forecast-hub")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, ticker: &Ticker, period: HistoryPeriod) -> String {
        format!(
            "{}/{}?range={}&interval=1d&includePrePost=false",
            self.base_url,
            ticker.as_str(),
            period.as_str()
        )
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn fetch(
        &self,
        ticker: &Ticker,
        period: HistoryPeriod,
    ) -> Result<RawPriceSeries, ForecastError> {
        let url = self.build_url(ticker, period);
        tracing::debug!(%ticker, %period, "fetching price history");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            ForecastError::SourceUnavailable(format!("history request for {ticker} failed: {e}"))
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            ForecastError::SourceUnavailable(format!("history body for {ticker}: {e}"))
        })?;

        // Yahoo answers unknown symbols with 404 plus a JSON error body.
        if !status.is_success() && status.as_u16() != 404 {
            return Err(ForecastError::SourceUnavailable(format!(
                "history request for {ticker} returned HTTP {status}"
            )));
        }
        parse_chart(&text)
    }
}

/// Decode a chart API body into a raw series.
///
/// A "Not Found" API error maps to an empty series so the caller reports
/// missing data; other API errors are transport-level failures.
fn parse_chart(body: &str) -> Result<RawPriceSeries, ForecastError> {
    let env: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| ForecastError::SourceUnavailable(format!("malformed history response: {e}")))?;

    if let Some(err) = env.chart.error {
        if err.code.eq_ignore_ascii_case("not found") {
            return Ok(RawPriceSeries::default());
        }
        return Err(ForecastError::SourceUnavailable(format!(
            "history API error [{}]: {}",
            err.code, err.description
        )));
    }

    let Some(data) = env.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(RawPriceSeries::default());
    };
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let offset = data.meta.gmtoffset;
    let points = data
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            let close = closes.get(i).copied().flatten();
            RawPrice::new(format_bar_date(ts, offset), close)
        })
        .collect();
    Ok(RawPriceSeries::new(points))
}

/// Exchange-local `YYYY-MM-DD` for a bar timestamp. Out-of-range timestamps
/// are passed through verbatim and dropped later as unparseable dates.
fn format_bar_date(ts: i64, gmtoffset: i64) -> String {
    ts.checked_add(gmtoffset)
        .and_then(|local| DateTime::from_timestamp(local, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
