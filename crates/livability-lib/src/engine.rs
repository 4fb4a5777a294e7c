//! Fully-built region state: network, nearest-node index, livability index
//! and path cache.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::cache::PathCache;
use crate::dataset::{load_region, RegionData};
use crate::error::Result;
use crate::geodesy::Coordinate;
use crate::livability::{compute_index, LivabilityIndex, LivabilityWeights};
use crate::network::{Mode, RoadNetwork};
use crate::path::{PathResult, SearchAlgorithm};
use crate::query::{PlaceFinder, PlaceRoute};
use crate::spatial::NearestNodeIndex;
use crate::zones::ZoneTable;

/// Everything needed to serve queries for one region. Built once, then
/// shared read-only; only the path cache mutates.
#[derive(Debug)]
pub struct Engine {
    zones: ZoneTable,
    weights: LivabilityWeights,
    livability: Arc<LivabilityIndex>,
    finder: PlaceFinder,
}

impl Engine {
    /// Build every derived structure for `region`.
    pub fn from_region(
        region: RegionData,
        weights: LivabilityWeights,
        cache_capacity: usize,
    ) -> Result<Self> {
        let RegionData { network, zones } = region;

        let index = Arc::new(NearestNodeIndex::build(&network));
        let livability = Arc::new(compute_index(&zones, &weights)?);
        let centroids = Arc::new(zones.centroids().clone());
        let cache = Arc::new(PathCache::new(cache_capacity));

        info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            zones = zones.len(),
            cache_capacity = cache.capacity(),
            "engine ready"
        );

        let finder = PlaceFinder::new(network, index, Arc::clone(&livability), centroids, cache);
        Ok(Self {
            zones,
            weights,
            livability,
            finder,
        })
    }

    /// Load a region database from disk and build the engine.
    pub fn load(path: &Path, weights: LivabilityWeights, cache_capacity: usize) -> Result<Self> {
        Self::from_region(load_region(path)?, weights, cache_capacity)
    }

    pub fn find_best_places(
        &self,
        destination: Coordinate,
        mode: Mode,
        top_n: usize,
    ) -> Result<Vec<PlaceRoute>> {
        self.finder.find_best_places(destination, mode, top_n)
    }

    /// Uncached route between two coordinates with an explicit algorithm.
    pub fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: Mode,
        algorithm: SearchAlgorithm,
    ) -> Result<PathResult> {
        self.finder
            .clone()
            .with_algorithm(algorithm)
            .compute_route(origin, destination, mode)
    }

    pub fn finder(&self) -> &PlaceFinder {
        &self.finder
    }

    pub fn cache(&self) -> &PathCache {
        self.finder.cache()
    }

    pub fn network(&self) -> &RoadNetwork {
        self.finder.network()
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn centroids(&self) -> &BTreeMap<String, Coordinate> {
        self.zones.centroids()
    }

    pub fn livability(&self) -> &LivabilityIndex {
        &self.livability
    }

    pub fn weights(&self) -> &LivabilityWeights {
        &self.weights
    }
}
