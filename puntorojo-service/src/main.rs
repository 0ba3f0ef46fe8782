use std::sync::Arc;

use anyhow::Result;
use puntorojo_service::{config::AppConfig, http_api, metrics_server, observability};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    http_api::serve(Arc::new(cfg)).await
}
