use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

/// Default Yahoo Finance chart endpoint used for daily close history.
pub const DEFAULT_PRICE_SOURCE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Service configuration derived from environment variables.
///
/// `MODEL_URL` keeps the name the existing deployment manifests already set,
/// so they can be reused as-is.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,

    // ── Inference service ──────────────────────────────────────────
    pub model_url: String,
    pub model_input_name: String,
    /// Bearer token for the inference call.  Empty ⇒ no auth header.
    pub model_token: String,
    pub model_timeout_ms: u64,
    /// Permit `http://` model URLs (cluster-internal services).
    pub model_allow_plaintext: bool,

    // ── Price history source ───────────────────────────────────────
    pub price_source_url: String,
    pub price_source_timeout_ms: u64,

    // ── Form ───────────────────────────────────────────────────────
    pub tickers: Vec<String>,
}

/// Reasons a configuration is refused at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingModelUrl,
    InvalidUrl { name: &'static str, value: String },
    UnsupportedScheme { name: &'static str, scheme: String },
    PlaintextModelUrl(String),
    ZeroTimeout(&'static str),
    InvalidBind(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingModelUrl => write!(f, "MODEL_URL is not set"),
            Self::InvalidUrl { name, value } => write!(f, "{name} is not a valid URL: {value}"),
            Self::UnsupportedScheme { name, scheme } => {
                write!(f, "{name} must use http or https, got {scheme}")
            }
            Self::PlaintextModelUrl(url) => write!(
                f,
                "MODEL_URL {url} is not TLS; set MODEL_ALLOW_PLAINTEXT=1 to allow it"
            ),
            Self::ZeroTimeout(name) => write!(f, "{name} must be greater than zero"),
            Self::InvalidBind(addr) => write!(f, "invalid bind address: {addr}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

/// Split a comma-separated ticker list, upper-casing and de-duplicating.
fn parse_tickers_csv(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in raw.split(',') {
        let t = t.trim().to_ascii_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 9000,
            model_url: String::new(),
            model_input_name: "lstm_input".to_string(),
            model_token: String::new(),
            model_timeout_ms: 10_000,
            model_allow_plaintext: false,
            price_source_url: DEFAULT_PRICE_SOURCE_URL.to_string(),
            price_source_timeout_ms: 10_000,
            tickers: vec!["IBM".to_string(), "AAPL".to_string(), "MSFT".to_string()],
        }
    }
}

impl AppConfig {
    /// Read the environment and validate the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let tickers = {
            let parsed = parse_tickers_csv(&env_str("FORECAST_TICKERS", ""));
            if parsed.is_empty() {
                defaults.tickers.clone()
            } else {
                parsed
            }
        };

        let cfg = Self {
            bind: env_str("FORECAST_BIND", &defaults.bind),
            port: env_u16("FORECAST_PORT", defaults.port),
            model_url: env_str("MODEL_URL", ""),
            model_input_name: env_str("MODEL_INPUT_NAME", &defaults.model_input_name),
            model_token: env_str("MODEL_TOKEN", ""),
            model_timeout_ms: env_u64("MODEL_TIMEOUT_MS", defaults.model_timeout_ms),
            model_allow_plaintext: env_bool("MODEL_ALLOW_PLAINTEXT", false),
            price_source_url: env_str("PRICE_SOURCE_URL", &defaults.price_source_url),
            price_source_timeout_ms: env_u64(
                "PRICE_SOURCE_TIMEOUT_MS",
                defaults.price_source_timeout_ms,
            ),
            tickers,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the invariants the clients rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_url.is_empty() {
            return Err(ConfigError::MissingModelUrl);
        }
        let model = check_url("MODEL_URL", &self.model_url)?;
        if model.scheme() == "http" && !self.model_allow_plaintext {
            return Err(ConfigError::PlaintextModelUrl(self.model_url.clone()));
        }
        check_url("PRICE_SOURCE_URL", &self.price_source_url)?;

        if self.model_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("MODEL_TIMEOUT_MS"));
        }
        if self.price_source_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("PRICE_SOURCE_TIMEOUT_MS"));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidBind(raw))
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    pub fn price_source_timeout(&self) -> Duration {
        Duration::from_millis(self.price_source_timeout_ms)
    }
}

fn check_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            name,
            scheme: other.to_string(),
        }),
    }
}
