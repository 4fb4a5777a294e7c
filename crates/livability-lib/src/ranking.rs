//! Distance-decayed ranking of zones against a destination.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::geodesy::{geodesic_distance_km, Coordinate};
use crate::livability::LivabilityIndex;

/// Number of places returned when the caller does not ask for a count.
pub const DEFAULT_TOP_N: usize = 5;

/// A zone considered for ranking, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub place: String,
    pub living_index: u8,
    pub distance_km: f64,
    pub centroid: Coordinate,
}

/// A scored zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlace {
    pub place: String,
    pub living_index: u8,
    /// Geodesic distance from the zone centroid to the destination.
    pub distance_km: f64,
    /// `living_index / distance_km`.
    pub score: f64,
    pub centroid: Coordinate,
}

/// Rank every zone with both an index and a centroid against `destination`.
///
/// Zones whose centroid is invalid, whose distance cannot be computed, or
/// whose distance is not strictly positive are skipped.
pub fn rank(
    index: &LivabilityIndex,
    centroids: &BTreeMap<String, Coordinate>,
    destination: Coordinate,
    top_n: usize,
) -> Result<Vec<RankedPlace>> {
    destination.validate()?;

    let mut candidates = Vec::with_capacity(index.len());
    for score in index.iter() {
        let Some(&centroid) = centroids.get(&score.name) else {
            warn!(zone = %score.name, "zone has no centroid; skipping");
            continue;
        };
        if let Err(err) = centroid.validate() {
            warn!(zone = %score.name, error = %err, "zone centroid is invalid; skipping");
            continue;
        }

        let distance_km = geodesic_distance_km(centroid, destination);
        if !distance_km.is_finite() {
            warn!(zone = %score.name, "distance to destination is not finite; skipping");
            continue;
        }

        candidates.push(Candidate {
            place: score.name.clone(),
            living_index: score.index,
            distance_km,
            centroid,
        });
    }

    Ok(rank_candidates(candidates, top_n))
}

/// Score, sort and truncate pre-computed candidates.
///
/// Order is score descending, then living index descending, then name.
pub fn rank_candidates(candidates: Vec<Candidate>, top_n: usize) -> Vec<RankedPlace> {
    let mut ranked: Vec<RankedPlace> = candidates
        .into_iter()
        .filter(|candidate| {
            let keep = candidate.distance_km > 0.0;
            if !keep {
                debug!(zone = %candidate.place, "zone coincides with destination; skipping");
            }
            keep
        })
        .map(|candidate| RankedPlace {
            score: f64::from(candidate.living_index) / candidate.distance_km,
            place: candidate.place,
            living_index: candidate.living_index,
            distance_km: candidate.distance_km,
            centroid: candidate.centroid,
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked.truncate(top_n);
    ranked
}

fn compare_ranked(a: &RankedPlace, b: &RankedPlace) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.living_index.cmp(&a.living_index))
        .then_with(|| a.place.cmp(&b.place))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(place: &str, living_index: u8, distance_km: f64) -> Candidate {
        Candidate {
            place: place.to_string(),
            living_index,
            distance_km,
            centroid: Coordinate::new(6.39, 2.39),
        }
    }

    #[test]
    fn closer_place_wins_when_score_is_higher() {
        let ranked = rank_candidates(vec![candidate("A", 8, 2.0), candidate("B", 6, 1.0)], 5);
        let names: Vec<_> = ranked.iter().map(|p| p.place.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(ranked[0].score, 6.0);
        assert_eq!(ranked[1].score, 4.0);
    }

    #[test]
    fn ties_break_on_index_then_name() {
        let ranked = rank_candidates(
            vec![
                candidate("Zogbo", 4, 1.0),
                candidate("Akpakpa", 8, 2.0),
                candidate("Agla", 4, 1.0),
            ],
            5,
        );
        let names: Vec<_> = ranked.iter().map(|p| p.place.as_str()).collect();
        assert_eq!(names, ["Akpakpa", "Agla", "Zogbo"]);
    }

    #[test]
    fn non_positive_distances_are_dropped() {
        let ranked = rank_candidates(
            vec![candidate("Here", 10, 0.0), candidate("There", 3, 1.5)],
            5,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].place, "There");
    }

    #[test]
    fn truncates_to_top_n() {
        let candidates = (1..=8)
            .map(|i| candidate(&format!("Z{i}"), 5, f64::from(i)))
            .collect();
        assert_eq!(rank_candidates(candidates, 3).len(), 3);
    }
}
