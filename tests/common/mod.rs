#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use forecast_hub::config::AppConfig;
use forecast_hub::error::ForecastError;
use forecast_hub::inference::InferenceClient;
use forecast_hub::pipeline::series::{RawPrice, RawPriceSeries};
use forecast_hub::pipeline::window::InputWindow;
use forecast_hub::source::{HistoryPeriod, PriceSource, Ticker};
use forecast_hub::state::AppState;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// `n` consecutive daily closes starting 2024-01-01, varying around 100.
pub fn daily_series(n: usize) -> RawPriceSeries {
    RawPriceSeries::new(
        (0..n)
            .map(|i| {
                let d = start_date() + Days::new(i as u64);
                let close = 100.0 + (i as f64 * 0.3).sin() * 10.0 + i as f64 * 0.05;
                RawPrice::new(d.format("%Y-%m-%d").to_string(), Some(close))
            })
            .collect(),
    )
}

pub struct StaticSource {
    series: RawPriceSeries,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(series: RawPriceSeries) -> Arc<Self> {
        Arc::new(Self {
            series,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PriceSource for StaticSource {
    async fn fetch(
        &self,
        _ticker: &Ticker,
        _period: HistoryPeriod,
    ) -> Result<RawPriceSeries, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.series.clone())
    }
}

/// Model stand-in returning a canned answer and recording its input.
pub struct FakeModel {
    output: Result<Vec<f64>, ForecastError>,
    pub calls: AtomicUsize,
    pub last_window: Mutex<Option<Vec<f64>>>,
}

impl FakeModel {
    pub fn returning(values: Vec<f64>) -> Arc<Self> {
        Arc::new(Self {
            output: Ok(values),
            calls: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        })
    }

    pub fn failing(err: ForecastError) -> Arc<Self> {
        Arc::new(Self {
            output: Err(err),
            calls: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for FakeModel {
    async fn predict(&self, window: &InputWindow) -> Result<Vec<f64>, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some(window.values().to_vec());
        self.output.clone()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        model_url: "https://model.test/v2/models/stock-predict-model/infer".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(source: Arc<StaticSource>, model: Arc<FakeModel>) -> Arc<AppState> {
    AppState::with_clients(test_config(), source, model)
}
