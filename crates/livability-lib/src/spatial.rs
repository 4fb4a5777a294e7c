//! KD-tree nearest-node index.
//!
//! Node coordinates are projected onto the unit sphere and stored in a 3D
//! KD-tree, giving O(log n) average-case nearest-node lookups. Squared chord
//! length is monotonic in great-circle distance, so the Euclidean nearest
//! neighbour is also the geographically nearest node.
//!
//! Nodes sharing a position are stored once, under the lowest [`NodeId`], so
//! duplicate coordinates resolve to that id and never crowd a tree bucket.
//! Distinct positions at exactly the same distance also resolve to the lowest
//! id among the closest few.

use std::collections::HashSet;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::info;

use crate::error::{Error, Result};
use crate::geodesy::{chord_squared_to_meters, Coordinate};
use crate::network::{Node, NodeId, RoadNetwork};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Candidates fetched per query so equidistant positions can be tie-broken.
const TIE_CANDIDATES: usize = 8;

/// Nearest match returned by [`NearestNodeIndex::nearest_with_distance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
    /// Great-circle distance from the query point, in meters.
    pub distance_m: f64,
}

/// Spatial index over the nodes of a road network.
pub struct NearestNodeIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    nodes: Vec<Node>,
    positions: usize,
}

impl NearestNodeIndex {
    /// Build the index from a road network.
    pub fn build(network: &RoadNetwork) -> Self {
        Self::from_nodes(network.nodes().copied())
    }

    /// Build the index from an arbitrary node set.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut nodes: Vec<Node> = nodes.into_iter().collect();
        nodes.sort_by_key(|node| node.id);

        // Sorted by id, so the first node seen at a position has the lowest id.
        let mut seen = HashSet::with_capacity(nodes.len());
        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (index, node) in nodes.iter().enumerate() {
            let position = node.coordinate.to_unit_vector();
            if seen.insert(position.map(f64::to_bits)) {
                tree.add(&position, index);
            }
        }

        let positions = seen.len();
        info!(node_count = nodes.len(), positions, "built nearest-node index");

        Self {
            tree,
            nodes,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Closest node id to a coordinate.
    pub fn nearest(&self, lat: f64, lng: f64) -> Result<NodeId> {
        self.nearest_with_distance(Coordinate::new(lat, lng))
            .map(|found| found.id)
    }

    /// Closest node to a coordinate, with its distance.
    pub fn nearest_with_distance(&self, point: Coordinate) -> Result<NearestNode> {
        if self.nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        point.validate()?;

        let query = point.to_unit_vector();
        let candidates = self
            .tree
            .nearest_n::<SquaredEuclidean>(&query, TIE_CANDIDATES.min(self.positions));

        let best = candidates
            .iter()
            .map(|neighbour| (neighbour.distance, &self.nodes[neighbour.item]))
            .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
            .ok_or_else(|| Error::ComputationFailure {
                message: "nearest-node query returned no candidates".to_string(),
            })?;

        Ok(NearestNode {
            id: best.1.id,
            coordinate: best.1.coordinate,
            distance_m: chord_squared_to_meters(best.0),
        })
    }

    /// O(n) scan used to cross-check the tree.
    #[cfg(test)]
    fn nearest_linear(&self, point: Coordinate) -> Result<NodeId> {
        let query = point.to_unit_vector();
        self.nodes
            .iter()
            .map(|node| {
                let v = node.coordinate.to_unit_vector();
                let d: f64 = v.iter().zip(query.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d, node.id)
            })
            .min_by(|(da, ia), (db, ib)| da.total_cmp(db).then_with(|| ia.cmp(ib)))
            .map(|(_, id)| id)
            .ok_or(Error::NoNodes)
    }
}

impl std::fmt::Debug for NearestNodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearestNodeIndex")
            .field("node_count", &self.nodes.len())
            .field("positions", &self.positions)
            .finish()
    }
}
