//! Test utilities for handler testing.
//!
//! States are built from the library's synthetic Cotonou sample region, so
//! no fixture files need to be checked in.

use std::path::{Path, PathBuf};

use livability_lib::fixtures::sample_region;
use livability_lib::{write_region, Engine, LivabilityWeights};

use crate::state::AppState;

/// Destination used across handler tests (just north of the sample grid).
pub const TEST_DESTINATION: (f64, f64) = (6.3913, 2.3860);

/// Fresh in-memory state over the sample region.
///
/// # Panics
///
/// Panics if the sample region fails to build, which indicates a broken
/// fixture rather than a test failure.
pub fn test_state() -> AppState {
    let region = sample_region().unwrap_or_else(|e| panic!("sample region is invalid: {e}"));
    let engine = Engine::from_region(region, LivabilityWeights::default(), 32)
        .unwrap_or_else(|e| panic!("sample engine failed to build: {e}"));
    AppState::from_engine(engine)
}

/// Write the sample region to `<dir>/cotonou.db` and return its path.
pub fn write_fixture_region(dir: &Path) -> PathBuf {
    let path = dir.join("cotonou.db");
    let region = sample_region().unwrap_or_else(|e| panic!("sample region is invalid: {e}"));
    write_region(&path, &region.network, &region.zones)
        .unwrap_or_else(|e| panic!("failed to write fixture region to {:?}: {e}", path));
    path
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}
