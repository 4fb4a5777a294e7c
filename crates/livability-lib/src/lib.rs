//! Livability routing-and-ranking engine.
//!
//! This crate loads a region's road network and zone feature table, answers
//! shortest-path queries between arbitrary coordinates, computes a livability
//! index per zone and ranks zones against a destination. Service and CLI
//! front-ends should only depend on the items exported here.
//!

#![deny(warnings)]

pub mod cache;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod geodesy;
pub mod livability;
pub mod network;
pub mod path;
pub mod query;
pub mod ranking;
pub mod spatial;
pub mod zones;

pub use cache::{CacheStats, PathCache, PathKey, SharedPathResult, DEFAULT_CACHE_CAPACITY};
pub use dataset::{load_region, region_path, write_region, RegionData};
pub use engine::Engine;
pub use error::{Error, Result};
pub use geodesy::{geodesic_distance_km, geodesic_distance_m, haversine_distance_m, Coordinate};
pub use livability::{compute_index, LivabilityIndex, LivabilityWeights, ZoneScore};
pub use network::{Edge, EdgeRecord, Mode, ModeSet, Node, NodeId, RoadNetwork};
pub use path::{shortest_path, shortest_path_with, PathResult, Route, SearchAlgorithm};
pub use query::{PlaceFinder, PlaceRoute};
pub use ranking::{rank, rank_candidates, Candidate, RankedPlace, DEFAULT_TOP_N};
pub use spatial::{NearestNode, NearestNodeIndex};
pub use zones::{Metric, ZoneFeatures, ZoneTable, METRIC_COUNT};
