//! Cache configuration.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default cache root.
pub const CACHE_DIR_ENV: &str = "REDPLANET_CACHE_DIR";

/// Default size above which cached files are trusted without re-hashing (1 GiB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 1 << 30;

/// Settings for a [`DatasetCache`](crate::DatasetCache).
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes:
///
/// ```yaml
/// cache_root: /data/redplanet
/// large_file_threshold: null   # always re-hash
/// verify_remote_stream: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory under which every dataset is stored.
    pub cache_root: PathBuf,
    /// Cached files larger than this many bytes skip re-verification on a
    /// cache hit. `None` disables the skip.
    pub large_file_threshold: Option<u64>,
    /// Hash the remote stream while downloading and refuse to persist on mismatch.
    pub verify_remote_stream: bool,
    /// Download attempts before giving up.
    pub max_attempts: u32,
    /// Pause between download attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout, in seconds. Archives can be several GB.
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            large_file_threshold: Some(DEFAULT_LARGE_FILE_THRESHOLD),
            verify_remote_stream: true,
            max_attempts: 3,
            retry_backoff_ms: 2000,
            connect_timeout_secs: 10,
            request_timeout_secs: 1800,
            user_agent: format!("redplanet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CacheConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Use a different cache root.
    pub fn with_cache_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Change the size above which cache hits skip re-hashing.
    pub fn with_large_file_threshold(mut self, bytes: Option<u64>) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    /// Toggle streamed verification of remote resources.
    pub fn with_remote_verification(mut self, enabled: bool) -> Self {
        self.verify_remote_stream = enabled;
        self
    }

    /// Change the retry budget.
    pub fn with_retries(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.max_attempts = max_attempts;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Whether a cached file of `size` bytes is trusted without re-hashing.
    pub fn skips_verification(&self, size: u64) -> bool {
        matches!(self.large_file_threshold, Some(limit) if size > limit)
    }
}

/// `$REDPLANET_CACHE_DIR`, else the platform cache dir plus `redplanet`.
pub fn default_cache_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .map(|d| d.join("redplanet"))
        .unwrap_or_else(|| PathBuf::from(".redplanet-cache"))
}
