use livability_lib::fixtures::sample_region;
use livability_lib::{load_region, region_path, write_region, Error, Metric, ZoneTable};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn region_round_trips_through_sqlite() {
    let dir = tempdir().expect("temp dir");
    let path = region_path(Some(dir.path()), "cotonou");
    let region = sample_region().unwrap();

    write_region(&path, &region.network, &region.zones).expect("region written");
    let loaded = load_region(&path).expect("region loads");

    assert_eq!(loaded.network.node_count(), region.network.node_count());
    assert_eq!(loaded.network.edge_records(), region.network.edge_records());
    for node in region.network.nodes() {
        assert_eq!(loaded.network.node(node.id), Some(node));
    }

    let original: Vec<_> = region.zones.features().collect();
    let reloaded: Vec<_> = loaded.zones.features().collect();
    assert_eq!(original, reloaded);
    assert_eq!(loaded.zones.centroids(), region.zones.centroids());
}

#[test]
fn null_metrics_load_as_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cotonou.db");
    let region = sample_region().unwrap();
    write_region(&path, &region.network, &region.zones).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute(
            "UPDATE zones SET transit_density = NULL WHERE name = 'Ganhi'",
            [],
        )
        .unwrap();
    drop(connection);

    let loaded = load_region(&path).unwrap();
    let ganhi = loaded.zones.get("Ganhi").unwrap();
    assert_eq!(ganhi.metric(Metric::TransitDensity), 0.0);
}

#[test]
fn isolated_nodes_still_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cotonou.db");
    let region = sample_region().unwrap();
    write_region(&path, &region.network, &region.zones).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute("INSERT INTO nodes (id, lat, lng) VALUES (500, 6.40, 2.36)", [])
        .unwrap();
    drop(connection);

    let loaded = load_region(&path).unwrap();
    assert_eq!(loaded.network.node_count(), region.network.node_count() + 1);
    assert_eq!(loaded.network.isolated_nodes(), vec![500]);
}

#[test]
fn dangling_edge_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.db");
    let region = sample_region().unwrap();
    write_region(&path, &region.network, &region.zones).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute(
            "INSERT INTO edges (source, target, length, modes, oneway) VALUES (1, 999, 5.0, 'walk', 0)",
            [],
        )
        .unwrap();
    drop(connection);

    assert!(matches!(
        load_region(&path),
        Err(Error::InvalidDataset { .. })
    ));
}

#[test]
fn unknown_mode_tag_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("modes.db");
    let region = sample_region().unwrap();
    write_region(&path, &region.network, &region.zones).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute("UPDATE edges SET modes = 'hovercraft' WHERE rowid = 1", [])
        .unwrap();
    drop(connection);

    assert!(matches!(
        load_region(&path),
        Err(Error::InvalidDataset { .. })
    ));
}

#[test]
fn empty_zone_table_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.db");
    let region = sample_region().unwrap();
    write_region(&path, &region.network, &ZoneTable::new()).unwrap();

    assert!(matches!(
        load_region(&path),
        Err(Error::DataUnavailable { .. })
    ));
}
