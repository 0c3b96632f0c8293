//! Client for the remote forecast model.
//!
//! Wire format follows the KServe v2 inference protocol: one FP32 input
//! tensor shaped `[1, lookback, 1]`, one output tensor whose flattened data
//! is the normalized forecast.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::ForecastError;
use crate::pipeline::window::InputWindow;

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send one input window, return the model's normalized forecast.
    ///
    /// The length of the result is not checked here; alignment against the
    /// horizon happens during reconciliation.
    async fn predict(&self, window: &InputWindow) -> Result<Vec<f64>, ForecastError>;
}

#[derive(Debug, Serialize)]
pub struct InferRequest<'a> {
    pub inputs: Vec<InferInput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InferInput<'a> {
    pub name: &'a str,
    pub datatype: &'static str,
    pub shape: [usize; 3],
    pub data: Vec<Vec<[f32; 1]>>,
}

impl<'a> InferRequest<'a> {
    pub fn for_window(input_name: &'a str, window: &InputWindow) -> Self {
        let steps: Vec<[f32; 1]> = window.to_f32().into_iter().map(|v| [v]).collect();
        Self {
            inputs: vec![InferInput {
                name: input_name,
                datatype: "FP32",
                shape: [1, steps.len(), 1],
                data: vec![steps],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    outputs: Vec<InferOutput>,
}

#[derive(Debug, Deserialize)]
struct InferOutput {
    #[serde(default)]
    name: String,
    data: Value,
}

/// Flatten nested numeric arrays in document order.
fn flatten_numbers(v: &Value, out: &mut Vec<f64>) -> Result<(), ForecastError> {
    match v {
        Value::Array(items) => {
            for item in items {
                flatten_numbers(item, out)?;
            }
            Ok(())
        }
        Value::Number(n) => {
            let f = n.as_f64().ok_or_else(|| {
                ForecastError::InferenceUnavailable(format!("non-finite output value {n}"))
            })?;
            out.push(f);
            Ok(())
        }
        other => Err(ForecastError::InferenceUnavailable(format!(
            "unexpected output element {other}"
        ))),
    }
}

/// Extract the first output tensor's data from a response body.
pub fn parse_infer_response(body: &str) -> Result<Vec<f64>, ForecastError> {
    let resp: InferResponse = serde_json::from_str(body)?;
    let output = resp.outputs.into_iter().next().ok_or_else(|| {
        ForecastError::InferenceUnavailable("response has no output tensors".to_string())
    })?;
    let mut values = Vec::new();
    flatten_numbers(&output.data, &mut values)?;
    tracing::debug!(output = %output.name, len = values.len(), "parsed model output");
    Ok(values)
}

/// HTTP(S) client for a KServe v2 `/infer` endpoint.
///
/// Certificates are always validated; plaintext URLs are only reachable when
/// the configuration opted in.
pub struct HttpInferenceClient {
    http: Client,
    url: String,
    input_name: String,
    token: String,
    timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(cfg: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("forecast-hub")
            .https_only(!cfg.model_allow_plaintext)
            .timeout(cfg.model_timeout())
            .build()?;
        Ok(Self {
            http,
            url: cfg.model_url.clone(),
            input_name: cfg.model_input_name.clone(),
            token: cfg.model_token.clone(),
            timeout: cfg.model_timeout(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ForecastError {
        if e.is_timeout() {
            ForecastError::InferenceTimeout(format!("no response within {:?}", self.timeout))
        } else {
            ForecastError::InferenceUnavailable(format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict(&self, window: &InputWindow) -> Result<Vec<f64>, ForecastError> {
        let payload = InferRequest::for_window(&self.input_name, window);

        let mut req = self.http.post(&self.url).json(&payload);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(ForecastError::InferenceUnavailable(format!(
                "model returned HTTP {status}: {snippet}"
            )));
        }
        parse_infer_response(&body)
    }
}
