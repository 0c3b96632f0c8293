use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ForecastError;
use crate::render::{chart_img_tag, render_chart_svg};
use crate::source::{HistoryPeriod, Ticker};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastForm {
    ticker: String,
    past_duration: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(form_page))
        .route("/data", get(data_direct).post(data_submit))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// GET / — ticker and period picker.
async fn form_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let tickers: String = state
        .config
        .tickers
        .iter()
        .map(|t| {
            let t = escape_html(t);
            format!("<option value=\"{t}\">{t}</option>")
        })
        .collect();
    let periods: String = HistoryPeriod::FORM_CHOICES
        .iter()
        .map(|p| format!("<option value=\"{}\">{}</option>", p.as_str(), p.label()))
        .collect();

    Html(format!(
        "<!doctype html>\n<html><head><title>Stock forecast</title></head><body>\n\
         <form action=\"/data\" method=\"POST\">\n\
         <label>Ticker <select name=\"ticker\">{tickers}</select></label>\n\
         <label>History <select name=\"past_duration\">{periods}</select></label>\n\
         <input type=\"submit\" value=\"Forecast\"/>\n\
         </form>\n</body></html>\n"
    ))
}

/// GET /data — the form posts here; a plain GET only gets a hint.
async fn data_direct() -> &'static str {
    "The URL /data is accessed directly. Try going to '/' to submit form"
}

/// POST /data — run the pipeline and answer with the chart embedded.
///
/// A body that does not decode into the form fields is a `BadRequest`.
async fn data_submit(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ForecastForm>, FormRejection>,
) -> Result<Html<String>, ForecastError> {
    let Form(form) = form.inspect_err(|e| tracing::warn!("rejected form body: {e}"))?;
    tracing::info!(ticker = %form.ticker, period = %form.past_duration, "forecast form submitted");
    let ticker = Ticker::parse(&form.ticker)?;
    let period = HistoryPeriod::parse(&form.past_duration)?;

    let outcome = state.pipeline.run(&ticker, period).await.inspect_err(|e| {
        tracing::error!(%ticker, %period, "forecast failed: {e}");
    })?;
    let svg = render_chart_svg(ticker.as_str(), &outcome.series)?;
    Ok(Html(chart_img_tag(&svg)))
}
