//! Best-places queries: ranking plus a cached route from each place.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{PathCache, PathKey, SharedPathResult};
use crate::error::Result;
use crate::geodesy::Coordinate;
use crate::livability::LivabilityIndex;
use crate::network::{Mode, RoadNetwork};
use crate::path::{shortest_path_with, PathResult, SearchAlgorithm};
use crate::ranking::{rank, RankedPlace};
use crate::spatial::NearestNodeIndex;

/// A ranked place together with the route from its centroid to the
/// destination. `route` is `None` when the route could not be resolved.
#[derive(Debug, Clone)]
pub struct PlaceRoute {
    pub place: RankedPlace,
    pub route: Option<Arc<PathResult>>,
}

impl PlaceRoute {
    /// `[[lat, lng], ...]` along the route, or `None` when there is no route.
    pub fn optimal_path(&self) -> Option<Vec<[f64; 2]>> {
        self.route
            .as_deref()
            .and_then(PathResult::route)
            .map(|route| route.coordinate_pairs())
    }
}

/// Answers best-places queries over shared read-only region state.
#[derive(Clone)]
pub struct PlaceFinder {
    network: RoadNetwork,
    index: Arc<NearestNodeIndex>,
    livability: Arc<LivabilityIndex>,
    centroids: Arc<BTreeMap<String, Coordinate>>,
    cache: Arc<PathCache>,
    algorithm: SearchAlgorithm,
}

impl PlaceFinder {
    pub fn new(
        network: RoadNetwork,
        index: Arc<NearestNodeIndex>,
        livability: Arc<LivabilityIndex>,
        centroids: Arc<BTreeMap<String, Coordinate>>,
        cache: Arc<PathCache>,
    ) -> Self {
        Self {
            network,
            index,
            livability,
            centroids,
            cache,
            algorithm: SearchAlgorithm::Dijkstra,
        }
    }

    /// Use `algorithm` for cached route computations.
    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn nearest_index(&self) -> &NearestNodeIndex {
        &self.index
    }

    /// Rank places near `destination` and attach a route from each.
    ///
    /// Only invalid input fails the call; per-place routing problems are
    /// logged and reported as a missing route.
    pub fn find_best_places(
        &self,
        destination: Coordinate,
        mode: Mode,
        top_n: usize,
    ) -> Result<Vec<PlaceRoute>> {
        let ranked = rank(&self.livability, &self.centroids, destination, top_n)?;
        debug!(places = ranked.len(), %mode, "ranked places");

        let results = ranked
            .into_iter()
            .map(|place| {
                let route = match self.route(place.centroid, destination, mode) {
                    Ok(route) => Some(route),
                    Err(err) => {
                        warn!(zone = %place.place, error = %err, "could not resolve route");
                        None
                    }
                };
                PlaceRoute { place, route }
            })
            .collect();

        Ok(results)
    }

    /// Cached route between two arbitrary coordinates.
    pub fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: Mode,
    ) -> SharedPathResult {
        let key = PathKey::new(origin, destination, mode).with_algorithm(self.algorithm);
        self.cache
            .get_or_compute(key, || self.compute_route(origin, destination, mode))
    }

    /// Uncached route, resolving both coordinates to their nearest nodes.
    pub fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: Mode,
    ) -> Result<PathResult> {
        let from = self.index.nearest_with_distance(origin)?;
        let to = self.index.nearest_with_distance(destination)?;
        debug!(
            from = from.id,
            to = to.id,
            snap_from_m = from.distance_m,
            snap_to_m = to.distance_m,
            "resolved route endpoints"
        );
        shortest_path_with(&self.network, from.id, to.id, mode, self.algorithm)
    }
}

impl std::fmt::Debug for PlaceFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceFinder")
            .field("nodes", &self.network.node_count())
            .field("zones", &self.livability.len())
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
