//! Best-path HTTP service.
//!
//! # Endpoints
//!
//! - `GET /best_path` - Rank livable zones near a destination, with routes
//! - `POST /admin/reload` - Reload the region from disk
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use livability_lib::{Coordinate, Engine, Error as LibError, Mode, PathResult, PlaceRoute};
use livability_service_shared::{
    from_lib_error, health_live, health_ready, metrics_handler, record_cache_stats,
    record_places_queried, record_query_failed, record_reload, record_route_length, AppState,
    AppStateError, BestPathParams, BestPathQuery, MetricsLayer, ProblemDetails, RequestId,
    ServiceResponse, Validate, PROBLEM_INVALID_MODE, PROBLEM_INVALID_REQUEST,
};

/// One ranked place in the `/best_path` response.
#[derive(Debug, Serialize)]
pub struct BestPlace {
    pub place: String,
    pub living_index: u8,
    /// Kilometres from the zone centroid to the destination.
    pub distance: f64,
    pub score: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub optimal_path: Option<Vec<[f64; 2]>>,
}

impl From<&PlaceRoute> for BestPlace {
    fn from(result: &PlaceRoute) -> Self {
        Self {
            place: result.place.place.clone(),
            living_index: result.place.living_index,
            distance: result.place.distance_km,
            score: result.place.score,
            latitude: result.place.centroid.lat,
            longitude: result.place.centroid.lng,
            optimal_path: result.optimal_path(),
        }
    }
}

/// Body of a successful `/best_path` response.
#[derive(Debug, Serialize)]
pub struct BestPathResponse {
    pub best_places: Vec<BestPlace>,
    /// Direct route from `origin_lat`/`origin_lng`, present only when an
    /// origin was supplied (`null` when no route exists).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_route: Option<Option<Vec<[f64; 2]>>>,
}

/// Build the service router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/best_path", get(best_path_handler))
        .route("/admin/reload", post(reload_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(CorsLayer::permissive())
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle `GET /best_path`.
pub async fn best_path_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<BestPathQuery>,
) -> Response {
    let request_id = request_id.to_string();

    let params = match query.validate(&request_id) {
        Ok(params) => params,
        Err(problem) => {
            let reason = if problem.type_uri == PROBLEM_INVALID_MODE {
                "invalid_mode"
            } else {
                "validation_error"
            };
            info!(request_id = %request_id, error = %problem.error, "rejected best_path request");
            record_query_failed(reason);
            return problem.into_response();
        }
    };

    info!(
        request_id = %request_id,
        dest_lat = params.destination.lat,
        dest_lng = params.destination.lng,
        mode = %params.mode,
        top_n = params.top_n,
        "handling best_path request"
    );

    let engine = state.engine();
    let outcome = tokio::task::spawn_blocking(move || answer(&engine, params)).await;

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            if e.is_client_error() {
                record_query_failed("validation_error");
            } else {
                error!(request_id = %request_id, error = %e, "best_path query failed");
                record_query_failed(match &e {
                    LibError::DataUnavailable { .. } => "data_unavailable",
                    _ => "internal_error",
                });
            }
            return from_lib_error(&e, &request_id).into_response();
        }
        Err(join_error) => {
            error!(request_id = %request_id, error = %join_error, "best_path task aborted");
            record_query_failed("internal_error");
            return ProblemDetails::internal_error(
                "The request could not be completed",
                request_id,
            )
            .into_response();
        }
    };

    record_places_queried(params.mode.as_str(), response.best_places.len());
    record_cache_stats(&state.engine().cache().stats());

    info!(
        request_id = %request_id,
        places = response.best_places.len(),
        "best_path computed"
    );

    ServiceResponse::new(response).into_response()
}

/// Blocking part of a `/best_path` request.
fn answer(engine: &Engine, params: BestPathParams) -> livability_lib::Result<BestPathResponse> {
    let results = engine.find_best_places(params.destination, params.mode, params.top_n)?;
    for result in &results {
        observe_route(result.route.as_deref(), params.mode);
    }

    let optimal_route = params
        .origin
        .map(|origin| direct_route(engine, origin, params.destination, params.mode));

    Ok(BestPathResponse {
        best_places: results.iter().map(BestPlace::from).collect(),
        optimal_route,
    })
}

fn direct_route(
    engine: &Engine,
    origin: Coordinate,
    destination: Coordinate,
    mode: Mode,
) -> Option<Vec<[f64; 2]>> {
    match engine.finder().route(origin, destination, mode) {
        Ok(result) => {
            observe_route(Some(result.as_ref()), mode);
            result.route().map(|route| route.coordinate_pairs())
        }
        Err(e) => {
            warn!(error = %e, "could not resolve direct route");
            None
        }
    }
}

fn observe_route(result: Option<&PathResult>, mode: Mode) {
    if let Some(route) = result.and_then(PathResult::route) {
        record_route_length(route.length_m, mode.as_str());
    }
}

/// Handle `POST /admin/reload`.
pub async fn reload_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let request_id = request_id.to_string();
    let reloading = state.clone();
    let outcome = tokio::task::spawn_blocking(move || reloading.reload()).await;

    match outcome {
        Ok(Ok(summary)) => {
            record_reload("ok");
            ServiceResponse::new(summary).into_response()
        }
        Ok(Err(AppStateError::ReloadUnavailable)) => {
            record_reload("failed");
            ProblemDetails::new(
                PROBLEM_INVALID_REQUEST,
                "Reload Unavailable",
                StatusCode::CONFLICT,
            )
            .with_detail("This service was not started from a region database")
            .with_request_id(request_id)
            .into_response()
        }
        Ok(Err(e)) => {
            error!(request_id = %request_id, error = %e, "region reload failed");
            record_reload("failed");
            ProblemDetails::service_unavailable(
                "Region reload failed; the previous data is still being served",
                request_id,
            )
            .into_response()
        }
        Err(join_error) => {
            error!(request_id = %request_id, error = %join_error, "reload task aborted");
            record_reload("failed");
            ProblemDetails::internal_error("Region reload was aborted", request_id).into_response()
        }
    }
}
