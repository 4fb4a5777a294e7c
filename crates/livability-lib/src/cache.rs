//! Bounded, single-flight cache of path computations.
//!
//! Each key maps to a shared [`OnceLock`] cell. The map lock is only held to
//! look up or insert the cell; the computation itself runs outside the lock,
//! so a slow path never blocks lookups for other keys while concurrent callers
//! for the same key wait on the cell and observe one result.
//!
//! Only completed entries are evicted. While computations are in flight the
//! map may hold more than `capacity` entries; it is trimmed back as they
//! finish.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Error;
use crate::geodesy::Coordinate;
use crate::network::Mode;
use crate::path::{PathResult, SearchAlgorithm};

/// Entry budget used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Result shared between every caller of the same key.
pub type SharedPathResult = std::result::Result<Arc<PathResult>, Arc<Error>>;

/// Exact `(origin, destination, mode, algorithm)` cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathKey {
    origin: [u64; 2],
    destination: [u64; 2],
    mode: Mode,
    algorithm: SearchAlgorithm,
}

impl PathKey {
    /// Key for a route computed with the default algorithm.
    pub fn new(origin: Coordinate, destination: Coordinate, mode: Mode) -> Self {
        Self {
            origin: coordinate_bits(origin),
            destination: coordinate_bits(destination),
            mode,
            algorithm: SearchAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

fn coordinate_bits(coordinate: Coordinate) -> [u64; 2] {
    // +0.0 and -0.0 describe the same point.
    let bits = |value: f64| if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() };
    [bits(coordinate.lat), bits(coordinate.lng)]
}

/// Counters exposed for diagnostics and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub evictions: u64,
}

type Cell = Arc<OnceLock<SharedPathResult>>;

struct Slot {
    cell: Cell,
    last_used: u64,
}

#[derive(Default)]
struct LruState {
    slots: HashMap<PathKey, Slot>,
    recency: BTreeMap<u64, PathKey>,
    tick: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &PathKey) {
        if let Some(slot) = self.slots.remove(key) {
            self.recency.remove(&slot.last_used);
        }
    }
}

/// LRU cache of [`PathResult`]s with per-key single-flight computation.
pub struct PathCache {
    capacity: usize,
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    evictions: AtomicU64,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl PathCache {
    /// Create a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop every entry. In-flight computations still complete for the
    /// callers already waiting on them, but their results are not retained.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.slots.clear();
        state.recency.clear();
        debug!("path cache cleared");
    }

    /// Return the cached result for `key`, running `compute` if no caller has
    /// done so yet. Errors are shared with concurrent waiters and then
    /// forgotten so a later call retries.
    pub fn get_or_compute<F>(&self, key: PathKey, compute: F) -> SharedPathResult
    where
        F: FnOnce() -> crate::Result<PathResult>,
    {
        let cell = self.cell_for(key);

        let result = cell
            .get_or_init(|| {
                self.computations.fetch_add(1, Ordering::Relaxed);
                compute().map(Arc::new).map_err(Arc::new)
            })
            .clone();

        let mut state = self.lock();
        if result.is_err() {
            let same_cell = state
                .slots
                .get(&key)
                .is_some_and(|slot| Arc::ptr_eq(&slot.cell, &cell));
            if same_cell {
                state.remove(&key);
            }
        }
        self.evict_completed(&mut state, self.capacity);

        result
    }

    fn cell_for(&self, key: PathKey) -> Cell {
        let mut state = self.lock();
        let tick = state.next_tick();

        if let Some(slot) = state.slots.get_mut(&key) {
            let previous = std::mem::replace(&mut slot.last_used, tick);
            let cell = Arc::clone(&slot.cell);
            state.recency.remove(&previous);
            state.recency.insert(tick, key);
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "path cache hit");
            return cell;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.evict_completed(&mut state, self.capacity - 1);

        let cell: Cell = Arc::new(OnceLock::new());
        state.slots.insert(
            key,
            Slot {
                cell: Arc::clone(&cell),
                last_used: tick,
            },
        );
        state.recency.insert(tick, key);
        cell
    }

    /// Evict completed entries, least recently used first, until at most
    /// `budget` remain. In-flight entries are skipped.
    fn evict_completed(&self, state: &mut LruState, budget: usize) {
        let excess = state.slots.len().saturating_sub(budget);
        if excess == 0 {
            return;
        }

        let slots = &state.slots;
        let victims: Vec<PathKey> = state
            .recency
            .values()
            .filter(|key| slots.get(key).is_some_and(|slot| slot.cell.get().is_some()))
            .take(excess)
            .copied()
            .collect();

        for key in victims {
            state.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "path cache eviction");
        }
        if state.slots.len() > budget {
            debug!(
                entries = state.slots.len(),
                budget, "path cache over budget while computations are in flight"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        // The state holds no invariants a panicking holder could break halfway.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Route;

    fn key(n: f64) -> PathKey {
        PathKey::new(Coordinate::new(6.0 + n, 2.0), Coordinate::new(6.5, 2.5), Mode::All)
    }

    fn single_point(id: i64) -> crate::Result<PathResult> {
        Ok(PathResult::Found(Route {
            nodes: vec![id],
            coordinates: vec![Coordinate::new(6.0, 2.0)],
            length_m: 0.0,
        }))
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = PathCache::new(4);
        let first = cache.get_or_compute(key(0.0), || single_point(1)).unwrap();
        let second = cache
            .get_or_compute(key(0.0), || panic!("should be cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.computations), (1, 1, 1));
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = PathCache::new(2);
        cache.get_or_compute(key(0.0), || single_point(0)).unwrap();
        cache.get_or_compute(key(1.0), || single_point(1)).unwrap();
        // Touch key 0 so key 1 becomes the eviction candidate.
        cache.get_or_compute(key(0.0), || single_point(0)).unwrap();
        cache.get_or_compute(key(2.0), || single_point(2)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);

        let mut recomputed = false;
        cache
            .get_or_compute(key(1.0), || {
                recomputed = true;
                single_point(1)
            })
            .unwrap();
        assert!(recomputed);
    }

    #[test]
    fn errors_are_not_retained() {
        let cache = PathCache::new(2);
        let err = cache
            .get_or_compute(key(0.0), || Err(Error::NodeNotFound { id: 3 }))
            .unwrap_err();
        assert!(matches!(*err, Error::NodeNotFound { id: 3 }));
        assert!(cache.is_empty());

        assert!(cache.get_or_compute(key(0.0), || single_point(3)).is_ok());
        assert_eq!(cache.stats().computations, 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = PathCache::new(2);
        cache.get_or_compute(key(0.0), || single_point(0)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn signed_zero_shares_a_key() {
        let a = PathKey::new(Coordinate::new(0.0, 2.0), Coordinate::new(1.0, 1.0), Mode::Walk);
        let b = PathKey::new(Coordinate::new(-0.0, 2.0), Coordinate::new(1.0, 1.0), Mode::Walk);
        assert_eq!(a, b);
        assert_ne!(a, PathKey::new(Coordinate::new(0.0, 2.0), Coordinate::new(1.0, 1.0), Mode::Bike));
    }

    #[test]
    fn algorithm_is_part_of_the_key() {
        let dijkstra = key(0.0);
        let a_star = key(0.0).with_algorithm(SearchAlgorithm::AStar);
        assert_eq!(dijkstra, key(0.0).with_algorithm(SearchAlgorithm::Dijkstra));
        assert_ne!(dijkstra, a_star);

        let cache = PathCache::new(4);
        cache.get_or_compute(dijkstra, || single_point(1)).unwrap();
        let other = cache.get_or_compute(a_star, || single_point(2)).unwrap();
        assert_eq!(other.route().unwrap().nodes, vec![2]);
        assert_eq!(cache.stats().computations, 2);
    }

    #[test]
    fn capacity_one_keeps_the_latest_entry() {
        let cache = PathCache::new(0);
        cache.get_or_compute(key(0.0), || single_point(0)).unwrap();
        cache.get_or_compute(key(1.0), || single_point(1)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache
            .get_or_compute(key(1.0), || panic!("should be cached"))
            .is_ok());
    }
}
