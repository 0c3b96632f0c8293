use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Terminal failure of a single forecast request.
///
/// Every variant is reported to the caller; none is retried or replaced by a
/// default value.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// History is empty or too short to build an input window.
    DataUnavailable(String),
    /// No historical date could be parsed, so there is no anchor for the
    /// forecast date range.
    DateParseFailure(String),
    /// The model returned a different number of steps than the horizon.
    ForecastLengthMismatch { expected: usize, actual: usize },
    /// Every close price is the same value; min/max scaling is undefined.
    DegenerateScale { value: f64 },
    /// Transport failure, non-2xx status or malformed response from the model.
    InferenceUnavailable(String),
    /// The model did not answer within `MODEL_TIMEOUT_MS`.
    InferenceTimeout(String),
    /// Transport failure talking to the price history source.
    SourceUnavailable(String),
    BadRequest(String),
    Render(String),
}

impl ForecastError {
    /// Stable machine-readable code, used in headers and JSON bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::DateParseFailure(_) => "date_parse_failure",
            Self::ForecastLengthMismatch { .. } => "forecast_length_mismatch",
            Self::DegenerateScale { .. } => "degenerate_scale",
            Self::InferenceUnavailable(_) => "inference_unavailable",
            Self::InferenceTimeout(_) => "inference_timeout",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::BadRequest(_) => "bad_request",
            Self::Render(_) => "render_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::DataUnavailable(_) | Self::DateParseFailure(_) | Self::DegenerateScale { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ForecastLengthMismatch { .. }
            | Self::InferenceUnavailable(_)
            | Self::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InferenceTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataUnavailable(msg) => write!(f, "data unavailable: {msg}"),
            Self::DateParseFailure(msg) => write!(f, "date parse failure: {msg}"),
            Self::ForecastLengthMismatch { expected, actual } => write!(
                f,
                "the length of forecast data ({actual}) does not match the forecast horizon ({expected})"
            ),
            Self::DegenerateScale { value } => {
                write!(f, "all close prices equal {value}; cannot normalize")
            }
            Self::InferenceUnavailable(msg) => write!(f, "inference unavailable: {msg}"),
            Self::InferenceTimeout(msg) => write!(f, "inference timed out: {msg}"),
            Self::SourceUnavailable(msg) => write!(f, "price source unavailable: {msg}"),
            Self::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Self::Render(msg) => write!(f, "chart rendering failed: {msg}"),
        }
    }
}

impl std::error::Error for ForecastError {}

/// Plain-text response for the HTML form flow: `Error: <message>`.
impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let mut resp = (status, format!("Error: {self}")).into_response();
        resp.headers_mut()
            .insert("x-error-code", HeaderValue::from_static(code));
        resp
    }
}

/// JSON wrapper used by the `/api` routes.
#[derive(Debug)]
pub struct ApiError(pub ForecastError);

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        });
        (self.0.status(), axum::Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(e: serde_json::Error) -> Self {
        Self::InferenceUnavailable(format!("malformed response: {e}"))
    }
}

impl From<FormRejection> for ForecastError {
    fn from(e: FormRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<JsonRejection> for ForecastError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_message_names_both_lengths() {
        let e = ForecastError::ForecastLengthMismatch {
            expected: 30,
            actual: 25,
        };
        assert_eq!(
            e.to_string(),
            "the length of forecast data (25) does not match the forecast horizon (30)"
        );
        assert_eq!(e.code(), "forecast_length_mismatch");
        assert_eq!(e.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn text_response_starts_with_error_prefix() {
        use http_body_util::BodyExt;

        let resp = ForecastError::DataUnavailable("no rows for ZZZZ".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            resp.headers().get("x-error-code").unwrap(),
            "data_unavailable"
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Error: data unavailable"), "{text}");
        assert!(text.ends_with("no rows for ZZZZ"));
    }

    #[tokio::test]
    async fn api_error_body_is_code_and_message() {
        use http_body_util::BodyExt;

        let resp = ApiError(ForecastError::BadRequest("missing field `ticker`".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], "bad_request");
        assert_eq!(v["message"], "bad request: missing field `ticker`");
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let e = ForecastError::InferenceTimeout("10000ms".into());
        assert_eq!(e.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
