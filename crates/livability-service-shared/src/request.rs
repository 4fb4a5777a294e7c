//! Request types and validation for HTTP endpoints.

use serde::{Deserialize, Serialize};

use livability_lib::{Coordinate, Mode, DEFAULT_TOP_N};

use crate::{from_lib_error, ProblemDetails};

/// Upper bound for the `top_n` query parameter.
pub const MAX_TOP_N: usize = 50;

/// Validation trait for request types.
///
/// Implementations check every field and convert the raw request into the
/// typed parameters the handler works with.
pub trait Validate {
    /// Typed parameters produced by a successful validation.
    type Output;

    /// Validate the request. The `request_id` populates the `instance` field
    /// of any returned `ProblemDetails`.
    ///
    /// Returns a boxed `ProblemDetails` to avoid large `Result::Err` variants.
    fn validate(&self, request_id: &str) -> Result<Self::Output, Box<ProblemDetails>>;
}

/// Raw query string of `GET /best_path`.
///
/// Fields are kept as strings so malformed numbers produce a problem
/// response instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestPathQuery {
    pub origin_lat: Option<String>,
    pub origin_lng: Option<String>,
    pub dest_lat: Option<String>,
    pub dest_lng: Option<String>,
    pub transportation: Option<String>,
    pub top_n: Option<String>,
}

/// Validated parameters of `GET /best_path`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestPathParams {
    /// Optional start point for a direct route to the destination.
    pub origin: Option<Coordinate>,
    pub destination: Coordinate,
    pub mode: Mode,
    pub top_n: usize,
}

impl Validate for BestPathQuery {
    type Output = BestPathParams;

    fn validate(&self, request_id: &str) -> Result<BestPathParams, Box<ProblemDetails>> {
        let lat = parse_coordinate("dest_lat", self.dest_lat.as_deref(), request_id)?;
        let lng = parse_coordinate("dest_lng", self.dest_lng.as_deref(), request_id)?;

        let destination = Coordinate::new(lat, lng);
        destination
            .validate()
            .map_err(|e| Box::new(from_lib_error(&e, request_id)))?;

        let origin = match (self.origin_lat.as_deref(), self.origin_lng.as_deref()) {
            (None, None) => None,
            (lat, lng) => {
                let origin = Coordinate::new(
                    parse_coordinate("origin_lat", lat, request_id)?,
                    parse_coordinate("origin_lng", lng, request_id)?,
                );
                origin
                    .validate()
                    .map_err(|e| Box::new(from_lib_error(&e, request_id)))?;
                Some(origin)
            }
        };

        let mode = match self.transportation.as_deref().map(str::trim) {
            None | Some("") => Mode::All,
            Some(value) => value
                .parse::<Mode>()
                .map_err(|e| Box::new(from_lib_error(&e, request_id)))?,
        };

        let top_n = match self.top_n.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TOP_N,
            Some(value) => {
                let parsed = value.parse::<usize>().map_err(|_| {
                    Box::new(ProblemDetails::bad_request(
                        format!("The 'top_n' parameter must be a positive integer, got '{value}'"),
                        request_id,
                    ))
                })?;
                if parsed == 0 || parsed > MAX_TOP_N {
                    return Err(Box::new(ProblemDetails::bad_request(
                        format!("The 'top_n' parameter must be between 1 and {MAX_TOP_N}"),
                        request_id,
                    )));
                }
                parsed
            }
        };

        Ok(BestPathParams {
            origin,
            destination,
            mode,
            top_n,
        })
    }
}

fn parse_coordinate(
    name: &str,
    value: Option<&str>,
    request_id: &str,
) -> Result<f64, Box<ProblemDetails>> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
        Box::new(ProblemDetails::bad_request(
            format!("The '{name}' parameter is required"),
            request_id,
        ))
    })?;

    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            Box::new(ProblemDetails::bad_request(
                format!("The '{name}' parameter must be a number, got '{value}'"),
                request_id,
            ))
        })
}
