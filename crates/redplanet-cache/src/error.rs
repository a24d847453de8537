//! Error types for the dataset cache.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, downloading or verifying datasets.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error reading or writing a cached file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (connection, timeout, body read).
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// Dataset name is not present in the registry.
    #[error("Dataset '{name}' not found. Options are: {}", known.join(", "))]
    DatasetNotFound {
        /// Requested dataset name.
        name: String,
        /// Every name the registry knows about.
        known: Vec<String>,
    },

    /// Hash algorithm name is not supported.
    #[error("Unsupported hash algorithm '{0}' (supported: xxh3_64, sha256)")]
    UnsupportedAlgorithm(String),

    /// A local file that should be hashed does not exist.
    #[error("Cannot hash {0}: file does not exist")]
    SourceUnavailable(PathBuf),

    /// Descriptor carries no declared digest at all.
    #[error("Dataset '{0}' declares no hash; the registry entry is misconfigured")]
    NoHashDeclared(String),

    /// Streamed remote bytes did not match the declared digest; nothing was written.
    #[error(
        "Remote resource {url} failed {algorithm} verification (expected {expected}, got {actual}); download aborted"
    )]
    RemoteIntegrity {
        /// Remote URL.
        url: String,
        /// Algorithm used.
        algorithm: String,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// Freshly downloaded file did not match the declared digest and was deleted.
    #[error(
        "Downloaded file {} failed {algorithm} verification (expected {expected}, got {actual}); the file was deleted",
        path.display()
    )]
    PostDownloadIntegrity {
        /// Local path that was removed.
        path: PathBuf,
        /// Algorithm used.
        algorithm: String,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// An existing cached file does not match the declared digest.
    #[error(
        "Cached file {} failed {algorithm} verification (expected {expected}, got {actual}). \
         It may be stale or corrupted; delete it and retry to download a fresh copy",
        path.display()
    )]
    CacheCorruption {
        /// Local path left untouched.
        path: PathBuf,
        /// Algorithm used.
        algorithm: String,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// Every download attempt failed.
    #[error("Failed to download {url} after {attempts} attempt(s): {last_error}")]
    DownloadFailed {
        /// Remote URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// Composite key missing from an index dataset.
    #[error("Key '{key}' not found in index '{index}'")]
    IndexEntryNotFound {
        /// Index dataset name.
        index: String,
        /// Requested key.
        key: String,
    },

    /// Index file could not be parsed.
    #[error("Invalid index '{index}' at line {line}: {reason}")]
    InvalidIndex {
        /// Index dataset name.
        index: String,
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// Registry or config YAML could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A lock was poisoned (a thread panicked while holding it).
    #[error("Cache lock was poisoned")]
    LockPoisoned,
}
