use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(metrics: &Metrics) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

pub fn router(settings_config: &SettingsConfig) -> Router {
    let state = AppState::new(get_metrics());
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Serve the scrape endpoint. Returns immediately when metrics are disabled.
pub async fn start(settings_config: &SettingsConfig) -> Result<()> {
    if !settings_config.metrics.is_enabled {
        info!("metrics endpoint disabled");
        return Ok(());
    }

    let app = router(settings_config);
    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding metrics server to {}", bind_addr))?;
    info!("metrics served at http://{}{}", bind_addr, settings_config.metrics.path);
    get_metrics().up.set(1);
    axum::serve(listener, app).await.context("metrics server failed")?;
    Ok(())
}
