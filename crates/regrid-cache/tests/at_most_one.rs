//! Concurrency behavior of the weight cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use regrid_cache::{CacheError, CacheKey, Triplet, WeightCache, WeightMatrix};
use regrid_core::repres::{RegularGaussian, SphericalHarmonics};

fn key() -> CacheKey {
    let input = SphericalHarmonics::new(63);
    let output = RegularGaussian::new(4).unwrap();
    CacheKey::weights("bilinear", &input, &output, None, None)
}

fn matrix() -> WeightMatrix {
    WeightMatrix::from_triplets(
        3,
        2,
        vec![Triplet {
            row: 2,
            col: 1,
            weight: 0.5,
        }],
    )
    .unwrap()
}

#[test]
fn concurrent_requesters_share_one_computation() {
    const WORKERS: usize = 8;

    let cache = WeightCache::in_memory();
    let computations = AtomicUsize::new(0);
    let barrier = Barrier::new(WORKERS);
    let key = key();

    let results: Vec<Arc<WeightMatrix>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_compute(&key, (3, 2), || -> Result<_, CacheError> {
                            computations.fetch_add(1, Ordering::SeqCst);
                            // Widen the window in which the other
                            // requesters arrive and must block.
                            thread::sleep(Duration::from_millis(20));
                            Ok(matrix())
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(computations.load(Ordering::SeqCst), 1);
    for other in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], other));
    }
    assert_eq!(cache.statistics().computations, 1);
    assert_eq!(cache.statistics().memory_hits, WORKERS - 1);
}

#[test]
fn racing_direct_inserts_keep_the_first_committer() {
    const WORKERS: usize = 4;

    let cache = WeightCache::in_memory();
    let barrier = Barrier::new(WORKERS);
    let key = key();

    let results: Vec<Arc<WeightMatrix>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|i| {
                let barrier = &barrier;
                let cache = &cache;
                let key = &key;
                scope.spawn(move || {
                    barrier.wait();
                    let mut own = matrix().triplets().to_vec();
                    own[0].weight = i as f64;
                    cache.put(key, WeightMatrix::from_triplets(3, 2, own).unwrap())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Every racer observed the same committed value, whichever won.
    for other in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], other));
    }
    assert_eq!(cache.statistics().discarded_writes, WORKERS - 1);
}
