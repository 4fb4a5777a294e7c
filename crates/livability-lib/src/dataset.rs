//! Region datasets stored as SQLite databases.
//!
//! The data-collection side writes one database per region; the service reads
//! it once at startup. [`write_region`] and [`load_region`] are exact inverses
//! so both sides agree on the layout:
//!
//! ```text
//! nodes(id INTEGER PRIMARY KEY, lat REAL, lng REAL)
//! edges(source INTEGER, target INTEGER, length REAL, modes TEXT, oneway INTEGER)
//! zones(name TEXT PRIMARY KEY, lat REAL, lng REAL, <seven metric columns>)
//! ```
//!
//! Metric columns are nullable; NULL means "unknown" and is read as `0.0`.

use std::env;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geodesy::Coordinate;
use crate::network::{EdgeRecord, ModeSet, Node, RoadNetwork};
use crate::zones::{Metric, ZoneFeatures, ZoneTable, METRIC_COUNT};

/// Environment variable overriding the dataset directory.
pub const DATA_DIR_ENV: &str = "LIVABILITY_DATA_DIR";

/// Directory used when no override is configured.
pub const DEFAULT_DATA_DIR: &str = "/data";

const REQUIRED_TABLES: [&str; 3] = ["nodes", "edges", "zones"];

/// Road network and zone table for one region, as loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct RegionData {
    pub network: RoadNetwork,
    pub zones: ZoneTable,
}

/// Resolve `<data_dir>/<region>.db`, honouring [`DATA_DIR_ENV`] when no
/// directory is given explicitly.
pub fn region_path(data_dir: Option<&Path>, region: &str) -> PathBuf {
    let dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    };
    dir.join(format!("{region}.db"))
}

/// Load a region database into memory.
///
/// Fails with [`Error::DataUnavailable`] when the file or one of its tables is
/// missing, or when the region has no zones.
pub fn load_region(path: &Path) -> Result<RegionData> {
    if !path.exists() {
        return Err(Error::DataUnavailable {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    for table in REQUIRED_TABLES {
        if !table_exists(&connection, table)? {
            return Err(Error::DataUnavailable {
                path: path.to_path_buf(),
                reason: format!("missing '{table}' table"),
            });
        }
    }

    let nodes = load_nodes(&connection)?;
    let edges = load_edges(&connection)?;
    let network = RoadNetwork::from_parts(nodes, edges)?;
    let zones = load_zones(&connection)?;

    if zones.is_empty() {
        return Err(Error::DataUnavailable {
            path: path.to_path_buf(),
            reason: "region has no zones".to_string(),
        });
    }

    let isolated = network.isolated_nodes();
    if !isolated.is_empty() {
        warn!(
            path = %path.display(),
            count = isolated.len(),
            sample = ?&isolated[..isolated.len().min(10)],
            "region has nodes without any edges"
        );
    }

    info!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        zones = zones.len(),
        "loaded region dataset"
    );

    Ok(RegionData { network, zones })
}

/// Write a region database, replacing any existing tables at `path`.
pub fn write_region(path: &Path, network: &RoadNetwork, zones: &ZoneTable) -> Result<()> {
    let mut connection = Connection::open(path)?;
    let tx = connection.transaction()?;

    let metric_columns: Vec<String> = Metric::ALL
        .iter()
        .map(|m| format!("{} REAL", m.key()))
        .collect();
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS nodes;
         DROP TABLE IF EXISTS edges;
         DROP TABLE IF EXISTS zones;
         CREATE TABLE nodes (id INTEGER PRIMARY KEY, lat REAL NOT NULL, lng REAL NOT NULL);
         CREATE TABLE edges (
             source INTEGER NOT NULL,
             target INTEGER NOT NULL,
             length REAL NOT NULL,
             modes TEXT NOT NULL,
             oneway INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE zones (name TEXT PRIMARY KEY, lat REAL NOT NULL, lng REAL NOT NULL, {});",
        metric_columns.join(", ")
    ))?;

    {
        let mut insert_node = tx.prepare("INSERT INTO nodes (id, lat, lng) VALUES (?1, ?2, ?3)")?;
        let mut nodes: Vec<&Node> = network.nodes().collect();
        nodes.sort_by_key(|node| node.id);
        for node in nodes {
            insert_node.execute(params![node.id, node.coordinate.lat, node.coordinate.lng])?;
        }

        let mut insert_edge = tx.prepare(
            "INSERT INTO edges (source, target, length, modes, oneway) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for edge in network.edge_records() {
            insert_edge.execute(params![
                edge.source,
                edge.target,
                edge.length_m,
                edge.modes.to_tags(),
                edge.oneway
            ])?;
        }

        let placeholders: Vec<String> = (4..4 + METRIC_COUNT).map(|i| format!("?{i}")).collect();
        let columns: Vec<&str> = Metric::ALL.iter().map(|m| m.key()).collect();
        let mut insert_zone = tx.prepare(&format!(
            "INSERT INTO zones (name, lat, lng, {}) VALUES (?1, ?2, ?3, {})",
            columns.join(", "),
            placeholders.join(", ")
        ))?;
        for zone in zones.features() {
            let centroid = zones.centroid(&zone.name).ok_or_else(|| {
                Error::invalid_dataset(format!("zone '{}' has no centroid", zone.name))
            })?;
            let v = zone.values();
            insert_zone.execute(params![
                zone.name,
                centroid.lat,
                centroid.lng,
                v[0],
                v[1],
                v[2],
                v[3],
                v[4],
                v[5],
                v[6]
            ])?;
        }
    }

    tx.commit()?;
    debug!(path = %path.display(), "wrote region dataset");
    Ok(())
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn load_nodes(connection: &Connection) -> Result<Vec<Node>> {
    let mut stmt = connection.prepare("SELECT id, lat, lng FROM nodes ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok(Node::new(row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut nodes = Vec::new();
    for node in rows {
        nodes.push(node?);
    }
    Ok(nodes)
}

fn load_edges(connection: &Connection) -> Result<Vec<EdgeRecord>> {
    let mut stmt = connection
        .prepare("SELECT source, target, length, modes, oneway FROM edges ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, bool>(4)?,
        ))
    })?;

    let mut edges = Vec::new();
    for entry in rows {
        let (source, target, length_m, tags, oneway) = entry?;
        edges.push(EdgeRecord {
            source,
            target,
            length_m,
            modes: ModeSet::parse_tags(&tags)?,
            oneway,
        });
    }
    Ok(edges)
}

fn load_zones(connection: &Connection) -> Result<ZoneTable> {
    let columns: Vec<&str> = Metric::ALL.iter().map(|m| m.key()).collect();
    let sql = format!(
        "SELECT name, lat, lng, {} FROM zones ORDER BY name",
        columns.join(", ")
    );
    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let mut values = [None; METRIC_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = row.get::<_, Option<f64>>(3 + i)?;
        }
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, f64>(1)?,
            row.get::<_, f64>(2)?,
            values,
        ))
    })?;

    let mut table = ZoneTable::new();
    for entry in rows {
        let (name, lat, lng, values) = entry?;
        let features = ZoneFeatures::new(name, values)?;
        table.insert(features, Some(Coordinate::new(lat, lng)))?;
    }
    Ok(table)
}
