//! Livability best-path HTTP service.
//!
//! # Configuration
//!
//! - `LIVABILITY_DATA_DIR` - Directory holding `<region>.db` (default: /data)
//! - `LIVABILITY_REGION` - Region to serve (default: cotonou)
//! - `LIVABILITY_WEIGHTS` - Optional livability weights JSON file
//! - `PATH_CACHE_CAPACITY` - Path cache entries (default: 128)
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `METRICS_ENABLED` - Set to "false" to disable `/metrics`
//! - `SERVICE_PORT` - HTTP port (default: 8080)

use std::env;
use std::net::SocketAddr;

use tracing::{error, info};

use livability_service_best_path::app;
use livability_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, RegionConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("best-path");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let region = RegionConfig::from_env();
    let port: u16 = env::var("SERVICE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    info!(
        region = %region.region,
        path = %region.db_path.display(),
        port = port,
        "starting best-path service"
    );

    // Missing data or inconsistent weights abort startup.
    let state = AppState::load(region.clone()).map_err(|e| {
        error!(error = %e, path = %region.db_path.display(), "failed to load application state");
        e
    })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
