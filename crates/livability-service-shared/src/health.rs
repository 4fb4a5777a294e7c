//! Health check handlers for liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_loaded: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones_loaded: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_paths: Option<usize>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            nodes_loaded: None,
            zones_loaded: None,
            cached_paths: None,
        }
    }

    pub fn ready(service: &str, version: &str, nodes: usize, zones: usize, cached: usize) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            nodes_loaded: Some(nodes),
            zones_loaded: Some(zones),
            cached_paths: Some(cached),
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            nodes_loaded: None,
            zones_loaded: None,
            cached_paths: None,
        }
    }
}

/// Liveness probe handler.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"livability-service-shared","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler. Ready once the engine has nodes and zones.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let engine = state.engine();
    let nodes = engine.network().node_count();
    let zones = engine.zones().len();

    if nodes == 0 || zones == 0 {
        let status = HealthStatus::not_ready(service, version, "region data not loaded");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(service, version, nodes, zones, engine.cache().len());
    (StatusCode::OK, Json(status)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_alive() {
        let status = HealthStatus::alive("best-path", "1.0.0");
        assert_eq!(status.status, "ok");
        assert!(status.nodes_loaded.is_none());
    }

    #[test]
    fn test_health_status_ready() {
        let status = HealthStatus::ready("best-path", "1.0.0", 18, 5, 0);
        assert_eq!(status.nodes_loaded, Some(18));
        assert_eq!(status.zones_loaded, Some(5));
    }

    #[test]
    fn test_health_status_not_ready() {
        let status = HealthStatus::not_ready("best-path", "1.0.0", "no data");
        assert!(status.status.starts_with("not_ready:"));
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::alive("best-path", "0.1.0")).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(!json.contains("nodes_loaded"));
    }
}
