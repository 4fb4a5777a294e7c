//! Application state shared by the axum handlers.
//!
//! The state holds the active [`Engine`] behind a lock so a reload can swap
//! it without restarting the process. Handlers take a cheap `Arc` snapshot
//! and never hold the lock while computing.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use livability_lib::dataset::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use livability_lib::{region_path, Engine, LivabilityWeights, DEFAULT_CACHE_CAPACITY};
use livability_lib::Error as LibError;

/// Environment variable selecting the region database.
pub const REGION_ENV: &str = "LIVABILITY_REGION";
/// Environment variable pointing at an optional weights JSON file.
pub const WEIGHTS_ENV: &str = "LIVABILITY_WEIGHTS";
/// Environment variable overriding the path cache capacity.
pub const CACHE_CAPACITY_ENV: &str = "PATH_CACHE_CAPACITY";
/// Region served when none is configured.
pub const DEFAULT_REGION: &str = "cotonou";

/// Error during application state initialization or reload.
#[derive(Debug)]
pub enum AppStateError {
    /// Region database file not found.
    DatabaseNotFound(String),

    /// Failed to load the region or build the engine.
    EngineLoad(LibError),

    /// The weights file is unreadable or inconsistent.
    Weights(LibError),

    /// The state was built in memory and has nothing to reload from.
    ReloadUnavailable,
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseNotFound(path) => write!(f, "region database not found: {}", path),
            Self::EngineLoad(e) => write!(f, "failed to load region: {}", e),
            Self::Weights(e) => write!(f, "failed to load livability weights: {}", e),
            Self::ReloadUnavailable => write!(f, "state has no region source to reload from"),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EngineLoad(e) | Self::Weights(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        Self::EngineLoad(err)
    }
}

/// Where the region comes from and how to build its engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    pub region: String,
    pub db_path: PathBuf,
    pub weights_path: Option<PathBuf>,
    pub cache_capacity: usize,
}

impl RegionConfig {
    pub fn new(region: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            region: region.into(),
            db_path: db_path.into(),
            weights_path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Read the configuration from the environment.
    ///
    /// - `LIVABILITY_DATA_DIR` (default `/data`)
    /// - `LIVABILITY_REGION` (default `cotonou`)
    /// - `LIVABILITY_WEIGHTS` (optional)
    /// - `PATH_CACHE_CAPACITY` (default 128)
    pub fn from_env() -> Self {
        let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let region = env::var(REGION_ENV)
            .ok()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let weights_path = env::var(WEIGHTS_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let cache_capacity = env::var(CACHE_CAPACITY_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        Self {
            db_path: region_path(Some(Path::new(&data_dir)), &region),
            region,
            weights_path,
            cache_capacity,
        }
    }

    pub fn with_weights(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights_path = Some(path.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Load weights (or the defaults) and build a fresh engine.
    pub fn build_engine(&self) -> Result<Engine, AppStateError> {
        if !self.db_path.exists() {
            return Err(AppStateError::DatabaseNotFound(
                self.db_path.display().to_string(),
            ));
        }

        let weights = match &self.weights_path {
            Some(path) => {
                LivabilityWeights::from_json_path(path).map_err(AppStateError::Weights)?
            }
            None => LivabilityWeights::default(),
        };

        tracing::info!(
            region = %self.region,
            path = %self.db_path.display(),
            cache_capacity = self.cache_capacity,
            "loading region"
        );
        Ok(Engine::load(&self.db_path, weights, self.cache_capacity)?)
    }
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub region: String,
    pub nodes: usize,
    pub zones: usize,
    pub loaded_at: String,
}

/// Shared application state for all axum handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: RwLock<Arc<Engine>>,
    source: Option<RegionConfig>,
    loaded_at: RwLock<DateTime<Utc>>,
}

impl AppState {
    /// Build the engine described by `config`. Fails if the region cannot be
    /// loaded or the weights are inconsistent.
    pub fn load(config: RegionConfig) -> Result<Self, AppStateError> {
        let engine = config.build_engine()?;
        Ok(Self::new(engine, Some(config)))
    }

    /// Wrap an already-built engine. Such a state cannot be reloaded.
    pub fn from_engine(engine: Engine) -> Self {
        Self::new(engine, None)
    }

    fn new(engine: Engine, source: Option<RegionConfig>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                engine: RwLock::new(Arc::new(engine)),
                source,
                loaded_at: RwLock::new(Utc::now()),
            }),
        }
    }

    /// Snapshot of the active engine.
    pub fn engine(&self) -> Arc<Engine> {
        Arc::clone(&read(&self.inner.engine))
    }

    pub fn region_config(&self) -> Option<&RegionConfig> {
        self.inner.source.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        *read(&self.inner.loaded_at)
    }

    /// Rebuild the engine from the configured source and swap it in.
    ///
    /// This blocks while the region loads; call it from a blocking task. On
    /// failure the current engine keeps serving. On success the previous
    /// engine's path cache is cleared under the same write lock as the swap.
    pub fn reload(&self) -> Result<ReloadSummary, AppStateError> {
        let source = self
            .inner
            .source
            .as_ref()
            .ok_or(AppStateError::ReloadUnavailable)?;

        let fresh = Arc::new(source.build_engine()?);
        let now = Utc::now();
        let summary = ReloadSummary {
            region: source.region.clone(),
            nodes: fresh.network().node_count(),
            zones: fresh.zones().len(),
            loaded_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        {
            let mut engine = write(&self.inner.engine);
            let previous = std::mem::replace(&mut *engine, fresh);
            previous.cache().clear();
            *write(&self.inner.loaded_at) = now;
        }

        tracing::info!(
            region = %summary.region,
            nodes = summary.nodes,
            zones = summary.zones,
            "region reloaded"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engine = self.engine();
        f.debug_struct("AppState")
            .field("node_count", &engine.network().node_count())
            .field("zone_count", &engine.zones().len())
            .field("reloadable", &self.inner.source.is_some())
            .finish()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
