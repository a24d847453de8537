//! # redplanet-cache
//!
//! Verified on-disk cache for large remote scientific datasets.
//!
//! A [`DatasetCache`] turns a logical dataset name into a local file whose
//! content matches a digest declared in a [`Registry`]. The file is
//! downloaded on first use and re-verified on every later use, across
//! process restarts.
//!
//! ## Overview
//!
//! - [`hash`] computes `xxh3_64` and `sha256` digests over 8 KiB chunks and
//!   always picks the fastest algorithm a descriptor declares.
//! - [`Fetcher`] streams a URL into a temporary file beside the destination,
//!   retrying transient failures a bounded number of times, and renames the
//!   file into place only once the transfer is complete.
//! - [`StaticRegistry`] maps names to [`DatasetDescriptor`]s; an
//!   [`IndexLayout`] derives descriptors from a cached CSV index keyed by
//!   composite model names.
//! - [`DatasetCache`] decides between cache hit, re-verification and fresh
//!   download.
//!
//! ## Verification rules
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | File absent, remote stream mismatches | [`CacheError::RemoteIntegrity`], nothing written |
//! | File absent, downloaded file mismatches | file deleted, [`CacheError::PostDownloadIntegrity`] |
//! | File present, larger than the threshold | trusted without hashing |
//! | File present, mismatches | [`CacheError::CacheCorruption`], file left untouched |
//!
//! ## Example
//!
//! ```no_run
//! use redplanet_cache::{CacheConfig, DatasetCache, DatasetDescriptor, HashAlgorithm, StaticRegistry};
//! use std::sync::Arc;
//!
//! let registry = StaticRegistry::new().with(
//!     DatasetDescriptor::new(
//!         "dichotomy_coords",
//!         "https://rutgers.box.com/shared/static/tekd1w26h9mvfnyw8bpy4ko4v48931ri",
//!         "dichotomy_coordinates-JAH-0-360.txt",
//!         "Crust/dichotomy",
//!     )
//!     .with_hash(
//!         HashAlgorithm::Sha256,
//!         "42f2b9f32c9e9100ef4a9977171a54654c3bf25602555945405a93ca45ac6bb2",
//!     ),
//! );
//!
//! let config = CacheConfig::default().with_cache_root("/tmp/redplanet");
//! let cache = DatasetCache::new(config, Arc::new(registry))?;
//!
//! let path = cache.resolve("dichotomy_coords")?;
//! println!("verified copy at {}", path.display());
//! # Ok::<(), redplanet_cache::CacheError>(())
//! ```

mod cache;
mod config;
mod error;
mod fetch;
pub mod hash;
mod index;
mod registry;

pub use cache::DatasetCache;
pub use config::{default_cache_root, CacheConfig, CACHE_DIR_ENV, DEFAULT_LARGE_FILE_THRESHOLD};
pub use error::CacheError;
pub use fetch::{FetchStats, Fetcher, HttpTransport, RetryPolicy, Transport};
pub use hash::HashAlgorithm;
pub use index::{DatasetIndex, IndexLayout};
pub use registry::{DatasetDescriptor, Registry, StaticRegistry};

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
