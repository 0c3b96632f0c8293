use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forecast_hub::config::AppConfig;
use forecast_hub::error::ForecastError;
use forecast_hub::inference::{HttpInferenceClient, InferenceClient};
use forecast_hub::pipeline::window::{build_input_window, InputWindow};

#[derive(Default)]
struct Seen {
    body: Option<Value>,
    auth: Option<String>,
}

type Shared = Arc<Mutex<Seen>>;

async fn infer_ok(State(seen): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let mut s = seen.lock().unwrap();
    s.body = Some(body);
    s.auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let data: Vec<f64> = (0..30).map(|i| i as f64 / 100.0).collect();
    Json(json!({
        "model_name": "stock-predict-model",
        "outputs": [{"name": "dense", "datatype": "FP32", "shape": [1, 30], "data": data}]
    }))
}

async fn infer_unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "model not loaded")
}

async fn infer_slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({"outputs": [{"name": "dense", "data": []}]}))
}

/// Serve a fake model on an ephemeral port and return its base URL.
async fn spawn_model(seen: Shared) -> String {
    let app = Router::new()
        .route("/v2/models/stock/infer", post(infer_ok))
        .route("/unavailable", post(infer_unavailable))
        .route("/slow", post(infer_slow))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(url: String) -> AppConfig {
    AppConfig {
        model_url: url,
        model_allow_plaintext: true,
        model_timeout_ms: 300,
        ..AppConfig::default()
    }
}

fn window() -> InputWindow {
    let series: Vec<f64> = (0..80).map(|i| i as f64 / 80.0).collect();
    build_input_window(&series, 60, 30).unwrap()
}

#[tokio::test]
async fn posts_window_and_parses_forecast() {
    let seen: Shared = Arc::default();
    let base = spawn_model(seen.clone()).await;
    let mut cfg = config(format!("{base}/v2/models/stock/infer"));
    cfg.model_token = "s3cret".to_string();
    let client = HttpInferenceClient::new(&cfg).unwrap();

    let out = client.predict(&window()).await.unwrap();
    assert_eq!(out.len(), 30);
    assert!((out[29] - 0.29).abs() < 1e-12);

    let s = seen.lock().unwrap();
    assert_eq!(s.auth.as_deref(), Some("Bearer s3cret"));
    let body = s.body.as_ref().unwrap();
    let input = &body["inputs"][0];
    assert_eq!(input["name"], "lstm_input");
    assert_eq!(input["datatype"], "FP32");
    assert_eq!(input["shape"], json!([1, 60, 1]));
    assert_eq!(input["data"][0].as_array().unwrap().len(), 60);
    assert_eq!(input["data"][0][0], json!([0.25]));
}

#[tokio::test]
async fn no_token_sends_no_auth_header() {
    let seen: Shared = Arc::default();
    let base = spawn_model(seen.clone()).await;
    let client = HttpInferenceClient::new(&config(format!("{base}/v2/models/stock/infer"))).unwrap();

    client.predict(&window()).await.unwrap();
    assert!(seen.lock().unwrap().auth.is_none());
}

#[tokio::test]
async fn non_success_status_is_unavailable() {
    let base = spawn_model(Arc::default()).await;
    let client = HttpInferenceClient::new(&config(format!("{base}/unavailable"))).unwrap();

    let err = client.predict(&window()).await.unwrap_err();
    match err {
        ForecastError::InferenceUnavailable(msg) => {
            assert!(msg.contains("503"));
            assert!(msg.contains("model not loaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_model_times_out() {
    let base = spawn_model(Arc::default()).await;
    let client = HttpInferenceClient::new(&config(format!("{base}/slow"))).unwrap();

    let err = client.predict(&window()).await.unwrap_err();
    assert!(matches!(err, ForecastError::InferenceTimeout(_)), "{err:?}");
}

#[tokio::test]
async fn plaintext_refused_without_opt_in() {
    let base = spawn_model(Arc::default()).await;
    let mut cfg = config(format!("{base}/v2/models/stock/infer"));
    cfg.model_allow_plaintext = false;
    let client = HttpInferenceClient::new(&cfg).unwrap();

    let err = client.predict(&window()).await.unwrap_err();
    assert!(matches!(err, ForecastError::InferenceUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_model_is_unavailable() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpInferenceClient::new(&config(format!("http://{addr}/infer"))).unwrap();
    let err = client.predict(&window()).await.unwrap_err();
    assert!(matches!(err, ForecastError::InferenceUnavailable(_)), "{err:?}");
}
