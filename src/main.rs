use anyhow::Context;
use tracing_subscriber::EnvFilter;

use forecast_hub::config::AppConfig;
use forecast_hub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env next to the binary; missing is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env().context("invalid configuration")?;
    let addr = cfg.socket_addr()?;
    tracing::info!(
        model_url = %cfg.model_url,
        tickers = ?cfg.tickers,
        "configuration loaded"
    );

    let state = AppState::new(cfg).context("build HTTP clients")?;
    let app = forecast_hub::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("forecast hub listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully stopping…");
}
