//! End-to-end tests for the `livability-cli` binary against the sample region.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use livability_lib::fixtures::sample_region;
use livability_lib::write_region;

struct TestEnv {
    _temp_dir: TempDir,
    data_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let data_dir = temp_dir.path().to_path_buf();
        let region = sample_region().expect("sample region");
        write_region(&data_dir.join("cotonou.db"), &region.network, &region.zones)
            .expect("write region");
        Self {
            _temp_dir: temp_dir,
            data_dir,
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.data_dir.join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("livability-cli").expect("binary exists");
        cmd.arg("--data-dir").arg(&self.data_dir);
        cmd
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn index_prints_zones_best_first() {
    let env = TestEnv::new();
    let output = env.cmd().arg("index").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).expect("utf8");

    let zones: Vec<&str> = text
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(zones.first(), Some(&"Ganhi"));
    assert_eq!(zones.last(), Some(&"Ile"));
    assert_eq!(zones.len(), 5);
}

#[test]
fn places_json_lists_requested_count() {
    let env = TestEnv::new();
    let output = env
        .cmd()
        .args([
            "places", "--lat", "6.3913", "--lng", "2.3860", "--top", "2", "--format", "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let rows: serde_json::Value = serde_json::from_slice(&output).expect("json output");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    for row in rows {
        let index = row["living_index"].as_u64().expect("index");
        assert!((1..=10).contains(&index));
        assert!(row["score"].as_f64().expect("score") > 0.0);
    }
}

#[test]
fn places_text_shows_route_summary() {
    let env = TestEnv::new();
    env.cmd()
        .args(["places", "--lat", "6.3913", "--lng", "2.3860", "--mode", "walk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. "))
        .stdout(predicate::str::contains("route:"));
}

#[test]
fn places_rejects_unknown_mode() {
    let env = TestEnv::new();
    env.cmd()
        .args(["places", "--lat", "6.39", "--lng", "2.38", "--mode", "boat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("boat"));
}

#[test]
fn places_rejects_out_of_range_destination() {
    let env = TestEnv::new();
    env.cmd()
        .args(["places", "--lat", "123.0", "--lng", "2.38"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to rank places"));
}

#[test]
fn route_walks_the_grid() {
    let env = TestEnv::new();
    env.cmd()
        .args([
            "route",
            "--from-lat",
            "6.35",
            "--from-lng",
            "2.38",
            "--to-lat",
            "6.38",
            "--to-lng",
            "2.41",
            "--mode",
            "walk",
            "--algorithm",
            "a-star",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Route: 6 hops"));
}

#[test]
fn route_to_the_island_has_no_path() {
    let env = TestEnv::new();
    env.cmd()
        .args([
            "route",
            "--from-lat",
            "6.35",
            "--from-lng",
            "2.38",
            "--to-lat",
            "6.4505",
            "--to-lng",
            "2.4505",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No path"));
}

#[test]
fn missing_region_reports_the_path() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--region", "porto-novo", "index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("porto-novo.db"));
}

#[test]
fn custom_weights_are_applied() {
    let env = TestEnv::new();
    let weights = env.write(
        "weights.json",
        r#"{"road_density": 1.0, "transit_density": 0.0, "healthcare_accessibility": 0.0,
            "education_accessibility": 0.0, "emergency_services_density": 0.0,
            "retail_density": 0.0, "employment_centers_density": 0.0}"#,
    );
    env.cmd()
        .args(["--weights", path_arg(&weights), "index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ganhi"));
}

#[test]
fn feature_table_replaces_stored_metrics() {
    let env = TestEnv::new();
    // Akpakpa becomes the best zone, Ganhi the worst.
    let csv = env.write(
        "features.csv",
        "Place,Road Density,Public Transport Density,Healthcare Accessibility,\
Education Accessibility,Emergency Services Density,Retail Density,Employment Centers Density\n\
Akpakpa,30,10,12,16,5,60,15\n\
Cadjehoun,18,6,7,12,2,35,9\n\
Fidjrosse,8,1,2,4,,10,2\n\
Ganhi,1,0,0,0,0,1,0\n\
Ile,2,,1,1,,3,1\n",
    );
    let output = env
        .cmd()
        .args(["--features", path_arg(&csv), "index"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let first = text.lines().nth(1).expect("first zone");
    let last = text.lines().last().expect("last zone");
    assert!(first.starts_with("Akpakpa"), "{text}");
    assert!(last.starts_with("Ganhi"), "{text}");
}

#[test]
fn check_weights_accepts_a_valid_file() {
    let env = TestEnv::new();
    let weights = env.write(
        "weights.json",
        r#"{"road_density": 0.125, "transit_density": 0.1875, "healthcare_accessibility": 0.125,
            "education_accessibility": 0.125, "emergency_services_density": 0.125,
            "retail_density": 0.1875, "employment_centers_density": 0.125}"#,
    );
    env.cmd()
        .args(["check-weights", path_arg(&weights)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Weights OK"))
        .stdout(predicate::str::contains("transit_density: 0.1875"));
}

#[test]
fn check_weights_rejects_a_bad_sum() {
    let env = TestEnv::new();
    let weights = env.write(
        "weights.json",
        r#"{"road_density": 0.5, "transit_density": 0.5, "healthcare_accessibility": 0.5,
            "education_accessibility": 0.0, "emergency_services_density": 0.0,
            "retail_density": 0.0, "employment_centers_density": 0.0}"#,
    );
    env.cmd()
        .args(["check-weights", path_arg(&weights)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("weight mismatch"));
}
