use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use livability_lib::{Coordinate, Error, Mode, PathCache, PathKey, PathResult, Route};

fn key() -> PathKey {
    PathKey::new(
        Coordinate::new(6.3650, 2.3950),
        Coordinate::new(6.3913, 2.3860),
        Mode::All,
    )
}

fn route() -> PathResult {
    PathResult::Found(Route {
        nodes: vec![1, 2],
        coordinates: vec![Coordinate::new(6.365, 2.395), Coordinate::new(6.39, 2.386)],
        length_m: 2_900.0,
    })
}

#[test]
fn concurrent_callers_share_one_computation() {
    const CALLERS: usize = 8;
    let cache = Arc::new(PathCache::new(16));
    let computations = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let computations = Arc::clone(&computations);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_compute(key(), || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(route())
                    })
                    .expect("computation succeeds")
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    assert_eq!(computations.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().computations, 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_waiters_receive_the_same_error() {
    const CALLERS: usize = 4;
    let cache = Arc::new(PathCache::new(16));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_compute(key(), || {
                    thread::sleep(Duration::from_millis(50));
                    Err(Error::ComputationFailure {
                        message: "boom".to_string(),
                    })
                })
            })
        })
        .collect();

    let errors: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap_err())
        .collect();

    assert!(errors
        .iter()
        .all(|err| matches!(**err, Error::ComputationFailure { .. })));
    assert!(cache.is_empty());
}

#[test]
fn distinct_keys_compute_independently() {
    let cache = PathCache::new(8);
    for mode in Mode::VARIANTS {
        let key = PathKey::new(
            Coordinate::new(6.3650, 2.3950),
            Coordinate::new(6.3913, 2.3860),
            mode,
        );
        cache.get_or_compute(key, || Ok(route())).unwrap();
    }
    assert_eq!(cache.stats().computations, 4);
    assert_eq!(cache.len(), 4);
}

#[test]
fn in_flight_entry_survives_eviction_pressure() {
    let cache = Arc::new(PathCache::new(1));
    let first_key = key();
    let other_key = PathKey::new(
        Coordinate::new(6.3520, 2.3820),
        Coordinate::new(6.3913, 2.3860),
        Mode::All,
    );
    let computations = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let slow = {
        let cache = Arc::clone(&cache);
        let computations = Arc::clone(&computations);
        thread::spawn(move || {
            cache
                .get_or_compute(first_key, || {
                    computations.fetch_add(1, Ordering::SeqCst);
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(route())
                })
                .expect("slow computation succeeds")
        })
    };
    started_rx.recv().unwrap();

    // A different key arrives while the first is still computing.
    cache.get_or_compute(other_key, || Ok(route())).unwrap();

    let waiter = {
        let cache = Arc::clone(&cache);
        let computations = Arc::clone(&computations);
        thread::spawn(move || {
            cache
                .get_or_compute(first_key, || {
                    computations.fetch_add(1, Ordering::SeqCst);
                    Ok(route())
                })
                .expect("waiter succeeds")
        })
    };
    while cache.stats().hits == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    release_tx.send(()).unwrap();

    let slow_result = slow.join().expect("slow thread completes");
    let waiter_result = waiter.join().expect("waiter completes");

    assert_eq!(computations.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&slow_result, &waiter_result));
    let stats = cache.stats();
    assert_eq!(stats.computations, 2);
    assert_eq!(stats.entries, 1);
}
