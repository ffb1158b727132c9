//! The two-tier weight and mask caches.
//!
//! Both caches memoize by [`CacheKey`] in an in-process map and,
//! optionally, in binary files under a cache directory. The guarantees:
//!
//! - at most one computation per key per process (a second concurrent
//!   requester blocks until the first's result is committed);
//! - a committed entry is never recomputed and never mutated;
//! - the disk tier is consulted before computing, and a fresh result is
//!   persisted (best-effort) before being returned;
//! - an unusable disk entry degrades to a miss and is repaired by the
//!   overwrite that follows the recomputation.
//!
//! Map locks cover individual map operations only. Computation happens
//! outside any lock, so unrelated keys never serialize each other.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::codec;
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::mask::Mask;
use crate::matrix::WeightMatrix;
use crate::store::{Claim, Store};

// ── CacheStatistics ─────────────────────────────────────────────

/// Counters maintained by a cache across its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Lookups answered from the in-process map.
    pub memory_hits: usize,
    /// Lookups answered by decoding an on-disk entry.
    pub disk_hits: usize,
    /// Entries produced by invoking the compute closure.
    pub computations: usize,
    /// Values discarded because another committer won the key.
    pub discarded_writes: usize,
}

// ── WeightCache ─────────────────────────────────────────────────

/// Content-addressed cache of interpolation weight matrices.
pub struct WeightCache {
    store: Store<WeightMatrix>,
    directory: Option<PathBuf>,
    stats: Mutex<CacheStatistics>,
}

impl WeightCache {
    /// A cache with no disk tier; entries live for the process only.
    pub fn in_memory() -> Self {
        Self {
            store: Store::new(),
            directory: None,
            stats: Mutex::new(CacheStatistics::default()),
        }
    }

    /// A cache persisting entries under `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the directory cannot be created.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            store: Store::new(),
            directory: Some(directory),
            stats: Mutex::new(CacheStatistics::default()),
        })
    }

    /// Look up a committed entry.
    ///
    /// Consults the in-process map only; blocks while the key is being
    /// computed by another thread, then reports that thread's result.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<WeightMatrix>> {
        let found = self.store.lookup(key.as_str());
        if found.is_some() {
            self.stat(|s| s.memory_hits += 1);
        }
        found
    }

    /// Commit an entry directly. First committer wins: when the key is
    /// already present the argument is discarded and the committed value
    /// returned, never an error.
    pub fn put(&self, key: &CacheKey, matrix: WeightMatrix) -> Arc<WeightMatrix> {
        let (committed, won) = self.store.commit(key.as_str(), matrix);
        if won {
            self.persist(key, &committed);
        } else {
            debug!(key = key.as_str(), "weight cache insert lost the race");
            self.stat(|s| s.discarded_writes += 1);
        }
        committed
    }

    /// Look up `key`, computing and committing the entry on a miss.
    ///
    /// `expected` is the `(rows, cols)` shape the caller requires; a disk
    /// entry of any other shape is treated as a miss. The compute closure
    /// runs outside the cache lock and at most once per key per process;
    /// concurrent requesters for the same key block until the entry is
    /// committed.
    ///
    /// # Errors
    ///
    /// Propagates the compute closure's error. The pending marker is
    /// released first, so a later requester retries the computation.
    pub fn get_or_compute<E>(
        &self,
        key: &CacheKey,
        expected: (usize, usize),
        compute: impl FnOnce() -> Result<WeightMatrix, E>,
    ) -> Result<Arc<WeightMatrix>, E> {
        match self.store.claim(key.as_str()) {
            Claim::Hit(matrix) => {
                debug!(key = key.as_str(), "weight cache memory hit");
                self.stat(|s| s.memory_hits += 1);
                return Ok(matrix);
            }
            Claim::Claimed => {}
        }

        if let Some(matrix) = self.load(key, expected) {
            debug!(key = key.as_str(), "weight cache disk hit");
            self.stat(|s| s.disk_hits += 1);
            let (committed, _) = self.store.commit(key.as_str(), matrix);
            return Ok(committed);
        }

        debug!(key = key.as_str(), "weight cache miss, computing");
        let matrix = match compute() {
            Ok(matrix) => matrix,
            Err(e) => {
                self.store.abandon(key.as_str());
                return Err(e);
            }
        };
        self.stat(|s| s.computations += 1);
        self.persist(key, &matrix);
        let (committed, won) = self.store.commit(key.as_str(), matrix);
        if !won {
            self.stat(|s| s.discarded_writes += 1);
        }
        Ok(committed)
    }

    /// A snapshot of the cache's counters.
    pub fn statistics(&self) -> CacheStatistics {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stat(&self, update: impl FnOnce(&mut CacheStatistics)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn load(&self, key: &CacheKey, expected: (usize, usize)) -> Option<WeightMatrix> {
        let path = self.directory.as_ref()?.join(key.file_name());
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "unreadable weight cache file, treating as miss");
                return None;
            }
        };
        match codec::decode_matrix(&mut BufReader::new(file), expected.0, expected.1) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "unusable weight cache file, treating as miss");
                None
            }
        }
    }

    fn persist(&self, key: &CacheKey, matrix: &WeightMatrix) {
        let Some(directory) = &self.directory else {
            return;
        };
        if let Err(e) = persist_entry(directory, &key.file_name(), |w| {
            codec::encode_matrix(w, matrix)
        }) {
            warn!(key = key.as_str(), error = %e, "failed to persist weight cache entry");
        }
    }
}

// ── MaskCache ───────────────────────────────────────────────────

/// Content-addressed cache of land-sea masks.
///
/// Identical policy to [`WeightCache`]; entries are [`Mask`] values and
/// the shape check is the point count.
pub struct MaskCache {
    store: Store<Mask>,
    directory: Option<PathBuf>,
    stats: Mutex<CacheStatistics>,
}

impl MaskCache {
    /// A cache with no disk tier.
    pub fn in_memory() -> Self {
        Self {
            store: Store::new(),
            directory: None,
            stats: Mutex::new(CacheStatistics::default()),
        }
    }

    /// A cache persisting entries under `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the directory cannot be created.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            store: Store::new(),
            directory: Some(directory),
            stats: Mutex::new(CacheStatistics::default()),
        })
    }

    /// Look up a committed mask, blocking while the key is pending.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Mask>> {
        let found = self.store.lookup(key.as_str());
        if found.is_some() {
            self.stat(|s| s.memory_hits += 1);
        }
        found
    }

    /// Commit a mask directly; first committer wins.
    pub fn put(&self, key: &CacheKey, mask: Mask) -> Arc<Mask> {
        let (committed, won) = self.store.commit(key.as_str(), mask);
        if won {
            self.persist(key, &committed);
        } else {
            debug!(key = key.as_str(), "mask cache insert lost the race");
            self.stat(|s| s.discarded_writes += 1);
        }
        committed
    }

    /// Look up `key`, computing and committing the mask on a miss.
    ///
    /// `expected_len` is the point count the caller requires; disk entries
    /// of any other length are treated as a miss.
    ///
    /// # Errors
    ///
    /// Propagates the compute closure's error after releasing the pending
    /// marker.
    pub fn get_or_compute<E>(
        &self,
        key: &CacheKey,
        expected_len: usize,
        compute: impl FnOnce() -> Result<Mask, E>,
    ) -> Result<Arc<Mask>, E> {
        match self.store.claim(key.as_str()) {
            Claim::Hit(mask) => {
                debug!(key = key.as_str(), "mask cache memory hit");
                self.stat(|s| s.memory_hits += 1);
                return Ok(mask);
            }
            Claim::Claimed => {}
        }

        if let Some(mask) = self.load(key, expected_len) {
            debug!(key = key.as_str(), "mask cache disk hit");
            self.stat(|s| s.disk_hits += 1);
            let (committed, _) = self.store.commit(key.as_str(), mask);
            return Ok(committed);
        }

        debug!(key = key.as_str(), "mask cache miss, computing");
        let mask = match compute() {
            Ok(mask) => mask,
            Err(e) => {
                self.store.abandon(key.as_str());
                return Err(e);
            }
        };
        self.stat(|s| s.computations += 1);
        self.persist(key, &mask);
        let (committed, won) = self.store.commit(key.as_str(), mask);
        if !won {
            self.stat(|s| s.discarded_writes += 1);
        }
        Ok(committed)
    }

    /// A snapshot of the cache's counters.
    pub fn statistics(&self) -> CacheStatistics {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stat(&self, update: impl FnOnce(&mut CacheStatistics)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn load(&self, key: &CacheKey, expected_len: usize) -> Option<Mask> {
        let path = self.directory.as_ref()?.join(key.file_name());
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "unreadable mask cache file, treating as miss");
                return None;
            }
        };
        match codec::decode_mask(&mut BufReader::new(file), expected_len) {
            Ok(points) => Some(Mask::new(key.as_str(), points)),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "unusable mask cache file, treating as miss");
                None
            }
        }
    }

    fn persist(&self, key: &CacheKey, mask: &Mask) {
        let Some(directory) = &self.directory else {
            return;
        };
        if let Err(e) = persist_entry(directory, &key.file_name(), |w| codec::encode_mask(w, mask))
        {
            warn!(key = key.as_str(), error = %e, "failed to persist mask cache entry");
        }
    }
}

/// Write a cache file atomically: encode into a unique temporary file in
/// the same directory, then rename over the final name. A concurrent
/// process writing the same key produces the same bytes, so whichever
/// rename lands last is as good as the first.
fn persist_entry(
    directory: &Path,
    file_name: &str,
    encode: impl FnOnce(&mut dyn std::io::Write) -> Result<(), CacheError>,
) -> Result<(), CacheError> {
    let mut temp = tempfile::Builder::new()
        .prefix(file_name)
        .suffix(".tmp")
        .tempfile_in(directory)?;
    encode(&mut temp)?;
    temp.persist(directory.join(file_name))
        .map_err(|e| CacheError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Triplet;
    use regrid_core::repres::{RegularGaussian, SphericalHarmonics};
    use std::io::Write;

    fn key() -> CacheKey {
        let input = SphericalHarmonics::new(63);
        let output = RegularGaussian::new(4).unwrap();
        CacheKey::weights("bilinear", &input, &output, None, None)
    }

    fn matrix() -> WeightMatrix {
        WeightMatrix::from_triplets(
            2,
            2,
            vec![Triplet {
                row: 1,
                col: 0,
                weight: 0.75,
            }],
        )
        .unwrap()
    }

    #[test]
    fn compute_once_then_memory_hit() {
        let cache = WeightCache::in_memory();
        let mut calls = 0;
        for _ in 0..3 {
            let m = cache
                .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> {
                    calls += 1;
                    Ok(matrix())
                })
                .unwrap();
            assert_eq!(*m, matrix());
        }
        assert_eq!(calls, 1);
        let stats = cache.statistics();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.memory_hits, 2);
    }

    #[test]
    fn put_then_get_round_trips() {
        let input = SphericalHarmonics::new(63);
        let output = RegularGaussian::new(4).unwrap();
        let cache = WeightCache::in_memory();

        let many = matrix();
        let one = WeightMatrix::from_triplets(
            1,
            1,
            vec![Triplet {
                row: 0,
                col: 0,
                weight: 1.0,
            }],
        )
        .unwrap();
        let zero = WeightMatrix::zero(4, 4);
        for (method, matrix) in [("a", many), ("b", one), ("c", zero)] {
            let key = CacheKey::weights(method, &input, &output, None, None);
            cache.put(&key, matrix.clone());
            assert_eq!(*cache.get(&key).unwrap(), matrix);
        }
        assert!(cache
            .get(&CacheKey::weights("d", &input, &output, None, None))
            .is_none());
    }

    #[test]
    fn put_first_committer_wins() {
        let cache = WeightCache::in_memory();
        let first = cache.put(&key(), matrix());
        let second = cache.put(&key(), WeightMatrix::zero(2, 2));
        assert_eq!(*first, *second);
        assert_eq!(*second, matrix());
        assert_eq!(cache.statistics().discarded_writes, 1);
    }

    #[test]
    fn failed_computation_releases_the_key() {
        let cache = WeightCache::in_memory();
        let err = cache
            .get_or_compute(&key(), (2, 2), || {
                Err::<WeightMatrix, _>(CacheError::Malformed {
                    detail: "kernel exploded".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));

        // The key is free again: the next requester computes.
        let m = cache
            .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> { Ok(matrix()) })
            .unwrap();
        assert_eq!(*m, matrix());
    }

    #[test]
    fn disk_tier_survives_a_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let first = WeightCache::with_directory(dir.path()).unwrap();
        first
            .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> { Ok(matrix()) })
            .unwrap();

        // A fresh cache over the same directory inherits the entry.
        let second = WeightCache::with_directory(dir.path()).unwrap();
        let m = second
            .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> {
                panic!("disk entry should have been used")
            })
            .unwrap();
        assert_eq!(*m, matrix());
        assert_eq!(second.statistics().disk_hits, 1);
        assert_eq!(second.statistics().computations, 0);
    }

    #[test]
    fn corrupt_disk_entry_degrades_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(key().file_name());
        fs::File::create(&path)
            .unwrap()
            .write_all(b"not a cache entry")
            .unwrap();

        let cache = WeightCache::with_directory(dir.path()).unwrap();
        let m = cache
            .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> { Ok(matrix()) })
            .unwrap();
        assert_eq!(*m, matrix());
        assert_eq!(cache.statistics().computations, 1);

        // The overwrite repaired the file.
        let repaired = WeightCache::with_directory(dir.path()).unwrap();
        repaired
            .get_or_compute(&key(), (2, 2), || -> Result<_, CacheError> {
                panic!("repaired entry should have been used")
            })
            .unwrap();
    }

    #[test]
    fn wrong_shape_disk_entry_degrades_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        let first = WeightCache::with_directory(dir.path()).unwrap();
        first.put(&key(), matrix());

        let second = WeightCache::with_directory(dir.path()).unwrap();
        let mut computed = false;
        second
            .get_or_compute(&key(), (5, 5), || -> Result<_, CacheError> {
                computed = true;
                Ok(WeightMatrix::zero(5, 5))
            })
            .unwrap();
        assert!(computed);
    }

    #[test]
    fn mask_cache_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = RegularGaussian::new(4).unwrap();
        let key = CacheKey::mask("lsm10m", &input);

        let first = MaskCache::with_directory(dir.path()).unwrap();
        first
            .get_or_compute(&key, 3, || -> Result<_, CacheError> {
                Ok(Mask::new(key.as_str(), vec![true, false, true]))
            })
            .unwrap();

        let second = MaskCache::with_directory(dir.path()).unwrap();
        let mask = second
            .get_or_compute(&key, 3, || -> Result<_, CacheError> {
                panic!("disk entry should have been used")
            })
            .unwrap();
        assert_eq!(mask.points(), &[true, false, true]);
    }
}
