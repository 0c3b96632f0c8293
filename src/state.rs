use std::sync::Arc;

use crate::config::AppConfig;
use crate::inference::{HttpInferenceClient, InferenceClient};
use crate::pipeline::ForecastPipeline;
use crate::source::{PriceSource, YahooSource};

/// Shared application state, passed to all route handlers via `axum::extract::State`.
///
/// Immutable after startup: requests share the HTTP connection pools and
/// nothing else.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: ForecastPipeline,
}

impl AppState {
    /// Build the production clients from configuration.
    pub fn new(config: AppConfig) -> Result<Arc<Self>, reqwest::Error> {
        let source = YahooSource::new(&config.price_source_url, config.price_source_timeout())?;
        let model = HttpInferenceClient::new(&config)?;
        Ok(Self::with_clients(config, Arc::new(source), Arc::new(model)))
    }

    /// Assemble state around caller-supplied collaborators.
    pub fn with_clients(
        config: AppConfig,
        source: Arc<dyn PriceSource>,
        model: Arc<dyn InferenceClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            pipeline: ForecastPipeline::new(source, model),
        })
    }
}
