//! Small synthetic region used by tests, benchmarks and local demos.
//!
//! The main component is a 4x4 street grid in central Cotonou with 0.01°
//! spacing. Horizontal streets are open to every mode, vertical streets only
//! to walking and cycling, except the western avenue which also allows
//! driving. Two extra nodes to the north-east form a separate island.

use crate::dataset::RegionData;
use crate::geodesy::{haversine_distance_m, Coordinate};
use crate::network::{EdgeRecord, Mode, Node, NodeId, RoadNetwork};
use crate::zones::{ZoneFeatures, ZoneTable};
use crate::Result;

const GRID: i64 = 4;
const ORIGIN_LAT: f64 = 6.35;
const ORIGIN_LNG: f64 = 2.38;
const STEP: f64 = 0.01;

/// First node id of the disconnected island.
pub const ISLAND_NODE: NodeId = 100;

/// Node id at `row`, `col` of the grid (both zero-based).
pub fn grid_node(row: i64, col: i64) -> NodeId {
    row * GRID + col + 1
}

/// Coordinate of the grid node at `row`, `col`.
pub fn grid_coordinate(row: i64, col: i64) -> Coordinate {
    Coordinate::new(
        ORIGIN_LAT + row as f64 * STEP,
        ORIGIN_LNG + col as f64 * STEP,
    )
}

/// The road network on its own.
pub fn sample_network() -> Result<RoadNetwork> {
    let mut nodes = Vec::new();
    for row in 0..GRID {
        for col in 0..GRID {
            let c = grid_coordinate(row, col);
            nodes.push(Node::new(grid_node(row, col), c.lat, c.lng));
        }
    }
    nodes.push(Node::new(ISLAND_NODE, 6.45, 2.45));
    nodes.push(Node::new(ISLAND_NODE + 1, 6.451, 2.451));

    let mut edges = Vec::new();
    for row in 0..GRID {
        for col in 0..GRID {
            if col + 1 < GRID {
                edges.push(street((row, col), (row, col + 1), &[Mode::All]));
            }
            if row + 1 < GRID {
                let modes: &[Mode] = if col == 0 {
                    &[Mode::Drive, Mode::Walk, Mode::Bike]
                } else {
                    &[Mode::Walk, Mode::Bike]
                };
                edges.push(street((row, col), (row + 1, col), modes));
            }
        }
    }
    edges.push(EdgeRecord::new(
        ISLAND_NODE,
        ISLAND_NODE + 1,
        haversine_distance_m(Coordinate::new(6.45, 2.45), Coordinate::new(6.451, 2.451)),
        &[Mode::All],
    ));

    RoadNetwork::from_parts(nodes, edges)
}

fn street(from: (i64, i64), to: (i64, i64), modes: &[Mode]) -> EdgeRecord {
    let length = haversine_distance_m(grid_coordinate(from.0, from.1), grid_coordinate(to.0, to.1));
    EdgeRecord::new(grid_node(from.0, from.1), grid_node(to.0, to.1), length, modes)
}

/// Five zones: four on the grid and one on the island.
pub fn sample_zones() -> Result<ZoneTable> {
    let rows: [(&str, Coordinate, [Option<f64>; 7]); 5] = [
        (
            "Akpakpa",
            Coordinate::new(6.352, 2.382),
            [Some(12.0), Some(3.0), Some(4.0), Some(9.0), Some(1.0), Some(20.0), Some(5.0)],
        ),
        (
            "Cadjehoun",
            Coordinate::new(6.365, 2.395),
            [Some(18.0), Some(6.0), Some(7.0), Some(12.0), Some(2.0), Some(35.0), Some(9.0)],
        ),
        (
            "Fidjrosse",
            Coordinate::new(6.372, 2.401),
            [Some(8.0), Some(1.0), Some(2.0), Some(4.0), None, Some(10.0), Some(2.0)],
        ),
        (
            "Ganhi",
            Coordinate::new(6.379, 2.409),
            [Some(25.0), Some(9.0), Some(11.0), Some(15.0), Some(4.0), Some(50.0), Some(14.0)],
        ),
        (
            "Ile",
            Coordinate::new(6.4505, 2.4505),
            [Some(2.0), None, Some(1.0), Some(1.0), None, Some(3.0), Some(1.0)],
        ),
    ];

    let mut table = ZoneTable::new();
    for (name, centroid, values) in rows {
        table.insert(ZoneFeatures::new(name, values)?, Some(centroid))?;
    }
    Ok(table)
}

/// The complete sample region.
pub fn sample_region() -> Result<RegionData> {
    Ok(RegionData {
        network: sample_network()?,
        zones: sample_zones()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_region_is_consistent() {
        let region = sample_region().unwrap();
        assert_eq!(region.network.node_count(), 18);
        assert_eq!(region.network.edge_count(), 25);
        assert_eq!(region.zones.len(), 5);
        assert!(region.network.isolated_nodes().is_empty());
    }
}
