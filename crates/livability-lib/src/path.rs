use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geodesy::{haversine_distance_m, Coordinate};
use crate::network::{Mode, NodeId, RoadNetwork};

/// Supported shortest-path algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SearchAlgorithm {
    /// Dijkstra's algorithm over edge lengths.
    #[default]
    Dijkstra,
    /// A* guided by the haversine distance to the goal. Only optimal when no
    /// edge is shorter than the straight line between its endpoints.
    AStar,
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SearchAlgorithm::Dijkstra => "dijkstra",
            SearchAlgorithm::AStar => "a-star",
        };
        f.write_str(value)
    }
}

impl std::str::FromStr for SearchAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(SearchAlgorithm::Dijkstra),
            "a-star" | "astar" | "a_star" => Ok(SearchAlgorithm::AStar),
            other => Err(Error::invalid_input(format!(
                "unknown search algorithm '{other}'"
            ))),
        }
    }
}

/// A discovered path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Node ids from origin to destination.
    pub nodes: Vec<NodeId>,
    /// Coordinates of `nodes`, in the same order.
    pub coordinates: Vec<Coordinate>,
    /// Sum of edge lengths along the path.
    pub length_m: f64,
}

impl Route {
    pub fn hop_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// `[[lat, lng], ...]` pairs for the wire format.
    pub fn coordinate_pairs(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(Coordinate::as_pair).collect()
    }
}

/// Outcome of a shortest-path query. `NoPath` is a normal result.
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult {
    Found(Route),
    NoPath,
}

impl PathResult {
    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            PathResult::Found(route) => Some(route),
            PathResult::NoPath => None,
        }
    }
}

/// Minimum-length path between two nodes using Dijkstra's algorithm.
pub fn shortest_path(
    network: &RoadNetwork,
    origin: NodeId,
    destination: NodeId,
    mode: Mode,
) -> Result<PathResult> {
    shortest_path_with(network, origin, destination, mode, SearchAlgorithm::Dijkstra)
}

/// Minimum-length path restricted to edges open to `mode`.
///
/// Equal-length alternatives resolve to the path discovered first when
/// expanding nodes by (cost, id) and neighbours by ascending id, so results
/// are reproducible on the same network.
pub fn shortest_path_with(
    network: &RoadNetwork,
    origin: NodeId,
    destination: NodeId,
    mode: Mode,
    algorithm: SearchAlgorithm,
) -> Result<PathResult> {
    for id in [origin, destination] {
        if !network.contains(id) {
            return Err(Error::NodeNotFound { id });
        }
    }

    if origin == destination {
        return Ok(PathResult::Found(build_route(network, vec![origin], 0.0)?));
    }

    let found = match algorithm {
        SearchAlgorithm::Dijkstra => search(network, origin, destination, mode, |_| 0.0),
        SearchAlgorithm::AStar => {
            let goal = node_coordinate(network, destination)?;
            search(network, origin, destination, mode, |node| {
                network
                    .node(node)
                    .map(|n| haversine_distance_m(n.coordinate, goal))
                    .unwrap_or(0.0)
            })
        }
    };

    match found {
        Some((nodes, length_m)) => Ok(PathResult::Found(build_route(network, nodes, length_m)?)),
        None => Ok(PathResult::NoPath),
    }
}

/// Best-first search shared by Dijkstra (zero heuristic) and A*.
fn search(
    network: &RoadNetwork,
    origin: NodeId,
    goal: NodeId,
    mode: Mode,
    heuristic: impl Fn(NodeId) -> f64,
) -> Option<(Vec<NodeId>, f64)> {
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = BinaryHeap::new();

    g_score.insert(origin, 0.0);
    queue.push(QueueEntry::new(origin, 0.0, heuristic(origin)));

    while let Some(entry) = queue.pop() {
        let current = match g_score.get(&entry.node) {
            Some(&best) if entry.cost.0 > best => continue,
            Some(&best) => best,
            None => continue,
        };

        if entry.node == goal {
            return Some((reconstruct_path(&parents, origin, goal), current));
        }

        for edge in network.edges_of(entry.node) {
            if !edge.modes.permits(mode) {
                continue;
            }

            let tentative = current + edge.length_m;
            let known = g_score.get(&edge.target).copied().unwrap_or(f64::INFINITY);
            if tentative < known {
                g_score.insert(edge.target, tentative);
                parents.insert(edge.target, entry.node);
                queue.push(QueueEntry::new(
                    edge.target,
                    tentative,
                    heuristic(edge.target),
                ));
            }
        }
    }

    None
}

fn reconstruct_path(parents: &HashMap<NodeId, NodeId>, start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match parents.get(&current) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

fn node_coordinate(network: &RoadNetwork, id: NodeId) -> Result<Coordinate> {
    network
        .node(id)
        .map(|node| node.coordinate)
        .ok_or(Error::NodeNotFound { id })
}

fn build_route(network: &RoadNetwork, nodes: Vec<NodeId>, length_m: f64) -> Result<Route> {
    let coordinates = nodes
        .iter()
        .map(|&id| node_coordinate(network, id))
        .collect::<Result<Vec<_>>>()?;
    Ok(Route {
        nodes,
        coordinates,
        length_m,
    })
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    cost: FloatOrd,
    estimate: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by estimate, then id.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
