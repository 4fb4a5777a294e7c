//! Coordinates and great-circle helpers.
//!
//! Zone ranking uses ellipsoidal (WGS-84) geodesic distances, which is what
//! intra-city comparisons need. Path search heuristics and nearest-node
//! lookups use the cheaper spherical model.

use geo::{Distance, Geodesic, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(Error::invalid_input(format!(
                "coordinate ({}, {}) is not finite",
                self.lat, self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::invalid_input(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::invalid_input(format!(
                "longitude {} is outside [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// `[lat, lng]` pair, the order used on the wire.
    pub fn as_pair(&self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    /// Position on the unit sphere. Chord length between two such vectors is
    /// monotonic in great-circle distance, so Euclidean nearest-neighbour
    /// search over them yields the geographically nearest point.
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Geodesic distance on the WGS-84 ellipsoid, in meters.
pub fn geodesic_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    Geodesic.distance(a.to_point(), b.to_point())
}

/// Geodesic distance on the WGS-84 ellipsoid, in kilometers.
pub fn geodesic_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    geodesic_distance_m(a, b) / 1000.0
}

/// Haversine (spherical, mean Earth radius) distance in meters.
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    Haversine.distance(a.to_point(), b.to_point())
}

/// Convert a squared chord length on the unit sphere to meters along the surface.
pub(crate) fn chord_squared_to_meters(chord_squared: f64) -> f64 {
    let chord = chord_squared.max(0.0).sqrt().min(2.0);
    2.0 * EARTH_RADIUS_M * (chord / 2.0).asin()
}
