//! Shared infrastructure for the livability HTTP services.
//!
//! This crate provides the HTTP glue around `livability-lib`:
//!
//! - [`AppState`]: The loaded region engine, swappable on reload
//! - [`health`]: Liveness/readiness handlers
//! - [`ProblemDetails`]: RFC 9457 Problem Details for consistent error responses
//! - [`ServiceResponse`]: Wrapper for successful responses with content type
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request tracking and metrics middleware
//! - Request types with validation for each endpoint
//!
//! # Architecture
//!
//! Handlers stay thin; ranking, routing and caching live in `livability-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse query parameters                                   │
//! │  - Validate parameters                                      │
//! │  - Call livability-lib APIs                                 │
//! │  - Format response                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module builds an in-memory state from the library's
//! sample region. Enable the `test-utils` feature to access it from
//! dependent crates.

#![deny(warnings)]

mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_cache_stats, record_places_queried,
    record_query_failed, record_reload, record_route_length, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId};
pub use problem::{
    from_lib_error, ProblemDetails, PROBLEM_INTERNAL_ERROR, PROBLEM_INVALID_MODE,
    PROBLEM_INVALID_REQUEST, PROBLEM_SERVICE_UNAVAILABLE,
};
pub use request::{BestPathParams, BestPathQuery, Validate, MAX_TOP_N};
pub use response::ServiceResponse;
pub use state::{AppState, AppStateError, RegionConfig, ReloadSummary};
