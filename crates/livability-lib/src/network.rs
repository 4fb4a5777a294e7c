//! Immutable road-network graph.
//!
//! Nodes carry WGS-84 coordinates, edges carry a length in meters and the set
//! of traversal modes allowed on them. The adjacency lists are sorted by
//! target id once at construction so every search expands neighbours in the
//! same order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geodesy::Coordinate;

/// Numeric identifier for a road-network node (OSM node ids fit).
pub type NodeId = i64;

/// Traversal mode used to restrict which edges a path may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Drive,
    Walk,
    Bike,
    /// Any edge may be used; an edge tagged `all` is open to every mode.
    #[default]
    All,
}

impl Mode {
    /// Every recognised mode, in tag order.
    pub const VARIANTS: [Mode; 4] = [Mode::Drive, Mode::Walk, Mode::Bike, Mode::All];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Drive => "drive",
            Mode::Walk => "walk",
            Mode::Bike => "bike",
            Mode::All => "all",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Mode::Drive => 0b0001,
            Mode::Walk => 0b0010,
            Mode::Bike => 0b0100,
            Mode::All => 0b1000,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drive" => Ok(Mode::Drive),
            "walk" => Ok(Mode::Walk),
            "bike" => Ok(Mode::Bike),
            "all" => Ok(Mode::All),
            _ => Err(Error::InvalidMode {
                mode: s.to_string(),
            }),
        }
    }
}

/// Set of traversal modes attached to an edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModeSet(u8);

impl ModeSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(modes: &[Mode]) -> Self {
        let mut set = Self::empty();
        for mode in modes {
            set.insert(*mode);
        }
        set
    }

    pub fn insert(&mut self, mode: Mode) {
        self.0 |= mode.bit();
    }

    /// Literal membership of the tag.
    pub fn contains(&self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether a search in `query` mode may traverse an edge with this set.
    pub fn permits(&self, query: Mode) -> bool {
        query == Mode::All || self.contains(Mode::All) || self.contains(query)
    }

    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::VARIANTS.into_iter().filter(|mode| self.contains(*mode))
    }

    /// Parse a comma-separated tag list such as `"drive,walk"`.
    pub fn parse_tags(tags: &str) -> Result<Self> {
        let mut set = Self::empty();
        for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let mode = tag
                .parse::<Mode>()
                .map_err(|_| Error::invalid_dataset(format!("unknown edge mode tag '{tag}'")))?;
            set.insert(mode);
        }
        if set.is_empty() {
            return Err(Error::invalid_dataset(format!(
                "edge mode list '{tags}' is empty"
            )));
        }
        Ok(set)
    }

    /// Inverse of [`ModeSet::parse_tags`].
    pub fn to_tags(&self) -> String {
        self.iter().map(Mode::as_str).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Debug for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Road-network node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coordinate: Coordinate,
}

impl Node {
    pub fn new(id: NodeId, lat: f64, lng: f64) -> Self {
        Self {
            id,
            coordinate: Coordinate::new(lat, lng),
        }
    }
}

/// Outgoing edge within the adjacency list.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: NodeId,
    pub length_m: f64,
    pub modes: ModeSet,
}

/// Edge as sourced from the data collector, before it is expanded into
/// adjacency entries.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub length_m: f64,
    pub modes: ModeSet,
    /// `false` means the edge is traversable in both directions.
    pub oneway: bool,
}

impl EdgeRecord {
    /// Bidirectional edge open to the given modes.
    pub fn new(source: NodeId, target: NodeId, length_m: f64, modes: &[Mode]) -> Self {
        Self {
            source,
            target,
            length_m,
            modes: ModeSet::of(modes),
            oneway: false,
        }
    }

    pub fn oneway(mut self) -> Self {
        self.oneway = true;
        self
    }
}

/// Read-only road-network graph for one region.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    nodes: Arc<HashMap<NodeId, Node>>,
    adjacency: Arc<HashMap<NodeId, Vec<Edge>>>,
    records: Arc<Vec<EdgeRecord>>,
}

impl RoadNetwork {
    /// Build and validate a network from node and edge lists.
    ///
    /// Every edge must reference known nodes and carry a finite, non-negative
    /// length with at least one mode tag.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<EdgeRecord>) -> Result<Self> {
        let mut node_map: HashMap<NodeId, Node> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if !node.coordinate.lat.is_finite() || !node.coordinate.lng.is_finite() {
                return Err(Error::invalid_dataset(format!(
                    "node {} has non-finite coordinates",
                    node.id
                )));
            }
            if node_map.insert(node.id, node).is_some() {
                return Err(Error::invalid_dataset(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }

        let mut adjacency: HashMap<NodeId, Vec<Edge>> = node_map
            .keys()
            .map(|&id| (id, Vec::new()))
            .collect();

        for record in &edges {
            for endpoint in [record.source, record.target] {
                if !node_map.contains_key(&endpoint) {
                    return Err(Error::invalid_dataset(format!(
                        "edge {} -> {} references unknown node {}",
                        record.source, record.target, endpoint
                    )));
                }
            }
            if !record.length_m.is_finite() || record.length_m < 0.0 {
                return Err(Error::invalid_dataset(format!(
                    "edge {} -> {} has invalid length {}",
                    record.source, record.target, record.length_m
                )));
            }
            if record.modes.is_empty() {
                return Err(Error::invalid_dataset(format!(
                    "edge {} -> {} has no mode tags",
                    record.source, record.target
                )));
            }

            push_edge(&mut adjacency, record.source, record.target, record);
            if !record.oneway && record.source != record.target {
                push_edge(&mut adjacency, record.target, record.source, record);
            }
        }

        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| {
                a.target
                    .cmp(&b.target)
                    .then_with(|| a.length_m.total_cmp(&b.length_m))
            });
        }

        debug!(
            nodes = node_map.len(),
            edges = edges.len(),
            "built road network"
        );

        Ok(Self {
            nodes: Arc::new(node_map),
            adjacency: Arc::new(adjacency),
            records: Arc::new(edges),
        })
    }

    /// Iterate over every node (unordered).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Outgoing edges of a node, sorted by target id. Unknown nodes have none.
    pub fn edges_of(&self, id: NodeId) -> &[Edge] {
        self.adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of sourced edges (a bidirectional edge counts once).
    pub fn edge_count(&self) -> usize {
        self.records.len()
    }

    /// Edges as they were sourced, for writing the network back out.
    pub fn edge_records(&self) -> &[EdgeRecord] {
        &self.records
    }

    /// Ids of nodes with no incident edges at all.
    pub fn isolated_nodes(&self) -> Vec<NodeId> {
        let mut touched: HashSet<NodeId> = HashSet::new();
        for record in self.records.iter() {
            touched.insert(record.source);
            touched.insert(record.target);
        }
        let mut isolated: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !touched.contains(id))
            .collect();
        isolated.sort_unstable();
        isolated
    }
}

impl Default for RoadNetwork {
    fn default() -> Self {
        Self {
            nodes: Arc::new(HashMap::new()),
            adjacency: Arc::new(HashMap::new()),
            records: Arc::new(Vec::new()),
        }
    }
}

fn push_edge(
    adjacency: &mut HashMap<NodeId, Vec<Edge>>,
    from: NodeId,
    to: NodeId,
    record: &EdgeRecord,
) {
    adjacency.entry(from).or_default().push(Edge {
        target: to,
        length_m: record.length_m,
        modes: record.modes,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> RoadNetwork {
        RoadNetwork::from_parts(
            vec![
                Node::new(3, 6.36, 2.40),
                Node::new(1, 6.37, 2.41),
                Node::new(2, 6.38, 2.42),
            ],
            vec![
                EdgeRecord::new(1, 3, 40.0, &[Mode::Walk]),
                EdgeRecord::new(1, 2, 25.0, &[Mode::Drive, Mode::Walk]),
                EdgeRecord::new(2, 3, 10.0, &[Mode::All]).oneway(),
            ],
        )
        .expect("valid network")
    }

    #[test]
    fn adjacency_is_sorted_by_target() {
        let network = triangle();
        let targets: Vec<NodeId> = network.edges_of(1).iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![2, 3]);
    }

    #[test]
    fn oneway_edges_only_go_forward() {
        let network = triangle();
        assert!(network.edges_of(2).iter().any(|e| e.target == 3));
        assert!(!network.edges_of(3).iter().any(|e| e.target == 2));
        assert_eq!(network.edge_count(), 3);
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let err = RoadNetwork::from_parts(
            vec![Node::new(1, 0.0, 0.0)],
            vec![EdgeRecord::new(1, 9, 1.0, &[Mode::Drive])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDataset { .. }));
        assert!(err.to_string().contains("unknown node 9"));
    }

    #[test]
    fn negative_length_is_rejected() {
        let err = RoadNetwork::from_parts(
            vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.001)],
            vec![EdgeRecord::new(1, 2, -1.0, &[Mode::Drive])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDataset { .. }));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let err = RoadNetwork::from_parts(
            vec![Node::new(1, 0.0, 0.0), Node::new(1, 1.0, 1.0)],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate node id 1"));
    }

    #[test]
    fn mode_set_permits() {
        let walk_only = ModeSet::of(&[Mode::Walk]);
        assert!(walk_only.permits(Mode::Walk));
        assert!(walk_only.permits(Mode::All));
        assert!(!walk_only.permits(Mode::Drive));

        let any = ModeSet::of(&[Mode::All]);
        assert!(any.permits(Mode::Bike));
    }

    #[test]
    fn mode_tags_round_trip() {
        let set = ModeSet::parse_tags("walk, drive").unwrap();
        assert_eq!(set.to_tags(), "drive,walk");
        assert!(ModeSet::parse_tags("").is_err());
        assert!(ModeSet::parse_tags("drive,boat").is_err());
    }

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!("BIKE".parse::<Mode>().unwrap(), Mode::Bike);
        assert!(matches!(
            "hovercraft".parse::<Mode>(),
            Err(Error::InvalidMode { .. })
        ));
    }

    #[test]
    fn isolated_nodes_are_reported() {
        let network = RoadNetwork::from_parts(
            vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.0, 0.001), Node::new(7, 1.0, 1.0)],
            vec![EdgeRecord::new(1, 2, 5.0, &[Mode::Drive])],
        )
        .unwrap();
        assert_eq!(network.isolated_nodes(), vec![7]);
    }
}
