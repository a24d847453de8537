//! Dataset cache: name in, verified local path out.

use crate::fetch::{FetchStats, Fetcher};
use crate::hash::{self, digests_match, HashAlgorithm};
use crate::index::{DatasetIndex, IndexLayout};
use crate::{CacheConfig, CacheError, DatasetDescriptor, Registry, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, info, warn};

/// Resolves logical dataset names to trustworthy local files.
///
/// On a miss the dataset is downloaded (hashing the stream when
/// [`CacheConfig::verify_remote_stream`] is set), persisted atomically, and
/// re-hashed from disk. On a hit the file is re-hashed unless it is larger
/// than [`CacheConfig::large_file_threshold`]. A cached file that fails
/// verification is reported, never replaced.
///
/// ## Thread Safety
///
/// Concurrent resolutions of the same path within a process are serialized:
/// the first caller downloads while the others wait and then verify the
/// finished file. Different datasets resolve in parallel.
pub struct DatasetCache {
    config: CacheConfig,
    registry: Arc<dyn Registry>,
    fetcher: Fetcher,
    /// Paths currently being resolved by some thread.
    in_flight: Mutex<HashSet<PathBuf>>,
    /// Signalled whenever a path leaves `in_flight`.
    resolve_complete: Condvar,
    /// Parsed index files keyed by index dataset name.
    indices: Mutex<HashMap<String, Arc<DatasetIndex>>>,
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("cache_root", &self.config.cache_root)
            .field("datasets", &self.registry.names())
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl DatasetCache {
    /// Create a cache that downloads over HTTP.
    pub fn new(config: CacheConfig, registry: Arc<dyn Registry>) -> Result<Self> {
        let fetcher = Fetcher::http(&config)?;
        Ok(Self::with_fetcher(config, registry, fetcher))
    }

    /// Create a cache with a caller-supplied fetcher.
    ///
    /// A relative cache root is anchored to the current directory here, so
    /// resolved paths stay valid if the process later changes directory.
    pub fn with_fetcher(mut config: CacheConfig, registry: Arc<dyn Registry>, fetcher: Fetcher) -> Self {
        match std::path::absolute(&config.cache_root) {
            Ok(root) => config.cache_root = root,
            Err(e) => warn!("Cannot absolutize cache root {}: {}", config.cache_root.display(), e),
        }
        debug!("Dataset cache rooted at {}", config.cache_root.display());
        Self {
            config,
            registry,
            fetcher,
            in_flight: Mutex::new(HashSet::new()),
            resolve_complete: Condvar::new(),
            indices: Mutex::new(HashMap::new()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.config.cache_root
    }

    /// Registry used for lookups.
    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    /// Download statistics, used to tell cache hits from fetches.
    pub fn fetch_stats(&self) -> FetchStats {
        self.fetcher.stats()
    }

    /// Expected local path for a descriptor.
    pub fn path_for(&self, descriptor: &DatasetDescriptor) -> PathBuf {
        self.config
            .cache_root
            .join(&descriptor.cache_subpath)
            .join(&descriptor.filename)
    }

    /// Whether the dataset's file is present (not verified).
    pub fn is_cached(&self, name: &str) -> Result<bool> {
        let descriptor = self.registry.lookup(name)?;
        Ok(self.path_for(&descriptor).is_file())
    }

    /// Verified local path for a registered dataset.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let descriptor = self.registry.lookup(name)?;
        self.resolve_descriptor(&descriptor)
    }

    /// Verified local path for an arbitrary descriptor.
    pub fn resolve_descriptor(&self, descriptor: &DatasetDescriptor) -> Result<PathBuf> {
        let (algorithm, expected) = descriptor.select_hash()?;
        let path = self.path_for(descriptor);

        let _claim = self.claim(&path)?;
        if path.exists() {
            self.verify_cached(&path, algorithm, expected)?;
        } else {
            self.download(descriptor, &path, algorithm, expected)?;
        }
        Ok(path)
    }

    /// Resolve every name, returning how many had to be downloaded.
    pub fn prefetch(&self, names: &[&str]) -> Result<usize> {
        let mut fetched = 0;
        for name in names {
            let cached = self.is_cached(name)?;
            self.resolve(name)?;
            if !cached {
                fetched += 1;
            }
        }
        info!("Prefetch complete: {} of {} datasets downloaded", fetched, names.len());
        Ok(fetched)
    }

    /// Hash the remote copy of a dataset and compare it to the declared digest
    /// without touching the cache.
    pub fn check_remote(&self, name: &str) -> Result<bool> {
        let descriptor = self.registry.lookup(name)?;
        let (algorithm, expected) = descriptor.select_hash()?;
        let actual = self.fetcher.remote_digest(&descriptor.url, algorithm)?;
        Ok(digests_match(expected, &actual))
    }

    /// Parsed index for a layout, resolving the index file on first use.
    pub fn index(&self, layout: &IndexLayout) -> Result<Arc<DatasetIndex>> {
        if let Some(index) = self.lock_indices()?.get(&layout.index_dataset) {
            return Ok(index.clone());
        }

        let path = self.resolve(&layout.index_dataset)?;
        let text = fs::read_to_string(&path)?;
        let index = Arc::new(DatasetIndex::parse(&text, layout)?);
        debug!("Loaded index '{}' with {} entries", layout.index_dataset, index.len());

        self.lock_indices()?
            .insert(layout.index_dataset.clone(), index.clone());
        Ok(index)
    }

    /// Descriptor for `key` in an index dataset.
    pub fn indexed_descriptor(&self, layout: &IndexLayout, key: &str) -> Result<DatasetDescriptor> {
        self.index(layout)?.descriptor(key, layout)
    }

    /// Two-hop resolution: index file, then the dataset keyed by `key`.
    pub fn resolve_indexed(&self, layout: &IndexLayout, key: &str) -> Result<PathBuf> {
        let descriptor = self.indexed_descriptor(layout, key)?;
        self.resolve_descriptor(&descriptor)
    }

    fn verify_cached(&self, path: &Path, algorithm: HashAlgorithm, expected: &str) -> Result<()> {
        let size = fs::metadata(path)?.len();
        if self.config.skips_verification(size) {
            info!(
                "Trusting {} without re-hashing ({} bytes exceeds threshold)",
                path.display(),
                size
            );
            return Ok(());
        }

        let actual = hash::digest_file(path, algorithm)?;
        if !digests_match(expected, &actual) {
            warn!("Cached file {} failed {} verification", path.display(), algorithm);
            return Err(CacheError::CacheCorruption {
                path: path.to_path_buf(),
                algorithm: algorithm.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        debug!("Cache hit: {}", path.display());
        Ok(())
    }

    fn download(
        &self,
        descriptor: &DatasetDescriptor,
        path: &Path,
        algorithm: HashAlgorithm,
        expected: &str,
    ) -> Result<()> {
        let stream_check = self.config.verify_remote_stream.then_some((algorithm, expected));
        self.fetcher.fetch_verified(&descriptor.url, path, stream_check)?;

        let actual = hash::digest_file(path, algorithm)?;
        if !digests_match(expected, &actual) {
            warn!("Downloaded {} failed {} verification, removing it", path.display(), algorithm);
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
            return Err(CacheError::PostDownloadIntegrity {
                path: path.to_path_buf(),
                algorithm: algorithm.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        info!("Cached '{}' at {}", descriptor.name, path.display());
        Ok(())
    }

    /// Wait until no other thread is resolving `path`, then claim it.
    fn claim(&self, path: &Path) -> Result<Claim<'_>> {
        let mut in_flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
        while in_flight.contains(path) {
            in_flight = self
                .resolve_complete
                .wait(in_flight)
                .map_err(|_| CacheError::LockPoisoned)?;
        }
        in_flight.insert(path.to_path_buf());
        Ok(Claim {
            cache: self,
            path: path.to_path_buf(),
        })
    }

    fn lock_indices(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<DatasetIndex>>>> {
        self.indices.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

/// Releases an in-flight path when dropped, including on error paths.
struct Claim<'a> {
    cache: &'a DatasetCache,
    path: PathBuf,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.cache.in_flight.lock() {
            in_flight.remove(&self.path);
        }
        self.cache.resolve_complete.notify_all();
    }
}
