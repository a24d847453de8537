//! Remote fetcher with bounded retries and atomic persistence.
//!
//! Bytes are streamed through a [`Transport`] in [`CHUNK_SIZE`] pieces into a
//! uniquely named temporary file next to the destination, and only renamed
//! into place once the stream completed (and, when requested, hashed to the
//! declared digest). A failed or interrupted attempt never leaves a file at
//! the destination path.
//!
//! ## Thread Safety
//!
//! A `Fetcher` is shared by reference. Statistics are atomics, and concurrent
//! fetches of the same URL each write their own temporary file, so the last
//! rename wins with identical verified content.

use crate::hash::{digests_match, HashAlgorithm, Hasher, CHUNK_SIZE};
use crate::{CacheConfig, CacheError, Result};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of remote byte streams.
///
/// The production implementation is [`HttpTransport`]; tests substitute an
/// in-memory one.
pub trait Transport: Send + Sync {
    /// Open `url` for reading.
    ///
    /// Errors returned here are treated as transient and retried.
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>>;
}

/// Blocking HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client with the timeouts and user agent from `config`.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client (proxies, TLS roots, ...).
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Box::new(response))
    }
}

/// Bounded retry with fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy described by a cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Transfer statistics for a fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Completed downloads persisted to disk.
    pub downloads: usize,
    /// Bytes persisted by completed downloads.
    pub bytes_downloaded: u64,
    /// Remote streams hashed without persisting.
    pub remote_digests: usize,
    /// Attempts that failed transiently and were retried.
    pub retries: usize,
}

/// Outcome of a single attempt.
enum AttemptError {
    /// Worth another try (network, HTTP status, body read).
    Transient(CacheError),
    /// Retrying cannot help (local disk, integrity).
    Fatal(CacheError),
}

/// Streams remote resources to disk with bounded retries.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    downloads: AtomicUsize,
    bytes_downloaded: AtomicU64,
    remote_digests: AtomicUsize,
    retries: AtomicUsize,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Fetcher {
    /// Create a fetcher over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            downloads: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
            remote_digests: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
        }
    }

    /// Create an HTTP fetcher from a cache configuration.
    pub fn http(config: &CacheConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), RetryPolicy::from_config(config)))
    }

    /// Retry policy in effect.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Statistics for this fetcher.
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            downloads: self.downloads.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            remote_digests: self.remote_digests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    /// Download `url` to `dest`, creating parent directories.
    ///
    /// Returns the number of bytes written.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.fetch_verified(url, dest, None)
    }

    /// Download `url` to `dest`, hashing the stream on the way.
    ///
    /// When `expected` is given and the streamed digest differs, the
    /// temporary file is discarded and [`CacheError::RemoteIntegrity`] is
    /// returned without retrying; `dest` is never touched.
    pub fn fetch_verified(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<(HashAlgorithm, &str)>,
    ) -> Result<u64> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        fs::create_dir_all(&parent)?;

        info!("Downloading {} -> {}", url, dest.display());
        let written = self.with_retries(url, || self.attempt_download(url, &parent, dest, expected))?;

        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(written, Ordering::Relaxed);
        info!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }

    /// Hash a remote resource without persisting it.
    pub fn remote_digest(&self, url: &str, algorithm: HashAlgorithm) -> Result<String> {
        let digest = self.with_retries(url, || {
            let mut reader = self.transport.open(url).map_err(AttemptError::Transient)?;
            let mut hasher = algorithm.hasher();
            stream_chunks(&mut reader, |chunk| {
                hasher.update(chunk);
                Ok(())
            })?;
            Ok(hasher.finalize_hex())
        })?;
        self.remote_digests.fetch_add(1, Ordering::Relaxed);
        Ok(digest)
    }

    fn attempt_download(
        &self,
        url: &str,
        parent: &Path,
        dest: &Path,
        expected: Option<(HashAlgorithm, &str)>,
    ) -> std::result::Result<u64, AttemptError> {
        let mut reader = self.transport.open(url).map_err(AttemptError::Transient)?;

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| AttemptError::Fatal(e.into()))?;

        let mut hasher: Option<Hasher> = expected.map(|(alg, _)| alg.hasher());
        let written = stream_chunks(&mut reader, |chunk| {
            if let Some(h) = hasher.as_mut() {
                h.update(chunk);
            }
            tmp.write_all(chunk)
        })?;

        tmp.as_file_mut()
            .flush()
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| AttemptError::Fatal(e.into()))?;

        if let (Some((algorithm, expected)), Some(hasher)) = (expected, hasher) {
            let actual = hasher.finalize_hex();
            if !digests_match(expected, &actual) {
                warn!("Remote {} digest mismatch for {}", algorithm, url);
                // Dropping `tmp` removes the partial file.
                return Err(AttemptError::Fatal(CacheError::RemoteIntegrity {
                    url: url.to_string(),
                    algorithm: algorithm.to_string(),
                    expected: expected.to_string(),
                    actual,
                }));
            }
            debug!("Remote {} digest verified for {}", algorithm, url);
        }

        tmp.persist(dest)
            .map_err(|e| AttemptError::Fatal(CacheError::Io(e.error)))?;
        Ok(written)
    }

    fn with_retries<T>(
        &self,
        url: &str,
        mut attempt: impl FnMut() -> std::result::Result<T, AttemptError>,
    ) -> Result<T> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for n in 1..=attempts {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transient(e)) => {
                    last_error = e.to_string();
                    if n < attempts {
                        warn!(
                            attempt = n,
                            max_attempts = attempts,
                            error = %e,
                            "Fetch of {} failed, retrying in {:?}",
                            url,
                            self.policy.backoff
                        );
                        self.retries.fetch_add(1, Ordering::Relaxed);
                        thread::sleep(self.policy.backoff);
                    }
                }
            }
        }

        Err(CacheError::DownloadFailed {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

/// Pump `reader` into `sink` chunk by chunk.
///
/// Read failures are transient; sink failures are local and fatal.
fn stream_chunks<R, F>(reader: &mut R, mut sink: F) -> std::result::Result<u64, AttemptError>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]) -> std::io::Result<()>,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(AttemptError::Transient(e.into())),
        };
        sink(&buf[..n]).map_err(|e| AttemptError::Fatal(e.into()))?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest_bytes;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Serves fixed bodies; the first `failures` opens of each URL fail.
    struct FlakyTransport {
        bodies: HashMap<String, Vec<u8>>,
        failures: u32,
        opens: Mutex<HashMap<String, u32>>,
    }

    impl FlakyTransport {
        fn new(url: &str, body: &[u8], failures: u32) -> Self {
            let mut bodies = HashMap::new();
            bodies.insert(url.to_string(), body.to_vec());
            Self {
                bodies,
                failures,
                opens: Mutex::new(HashMap::new()),
            }
        }

        fn opens(&self, url: &str) -> u32 {
            self.opens.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    impl Transport for FlakyTransport {
        fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
            let n = {
                let mut opens = self.opens.lock().unwrap();
                let n = opens.entry(url.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            if n <= self.failures {
                return Err(CacheError::HttpStatus {
                    url: url.to_string(),
                    status: 503,
                });
            }
            match self.bodies.get(url) {
                Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
                None => Err(CacheError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(0),
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_fetch_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"hello", 0));
        let fetcher = Fetcher::new(transport, quick_policy(3));

        let dest = dir.path().join("nested/deeper/a.txt");
        let written = fetcher.fetch("mem://a", &dest).unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(&dest).unwrap(), b"hello");
        assert_eq!(dir_entries(dest.parent().unwrap()), vec!["a.txt".to_string()]);
        assert_eq!(fetcher.stats().downloads, 1);
        assert_eq!(fetcher.stats().bytes_downloaded, 5);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"hello", 2));
        let fetcher = Fetcher::new(transport.clone(), quick_policy(3));

        fetcher.fetch("mem://a", &dir.path().join("a.txt")).unwrap();

        assert_eq!(transport.opens("mem://a"), 3);
        assert_eq!(fetcher.stats().retries, 2);
    }

    #[test]
    fn test_exhausted_retries_report_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"hello", 10));
        let fetcher = Fetcher::new(transport.clone(), quick_policy(3));
        let dest = dir.path().join("a.txt");

        match fetcher.fetch("mem://a", &dest) {
            Err(CacheError::DownloadFailed {
                attempts,
                last_error,
                ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"), "{}", last_error);
            }
            other => panic!("expected DownloadFailed, got {:?}", other),
        }
        assert_eq!(transport.opens("mem://a"), 3);
        assert!(!dest.exists());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_remote_mismatch_leaves_nothing_and_does_not_retry() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"tampered", 0));
        let fetcher = Fetcher::new(transport.clone(), quick_policy(3));
        let dest = dir.path().join("a.txt");
        let expected = digest_bytes(b"original", HashAlgorithm::Sha256);

        let err = fetcher
            .fetch_verified("mem://a", &dest, Some((HashAlgorithm::Sha256, &expected)))
            .unwrap_err();

        assert!(matches!(err, CacheError::RemoteIntegrity { .. }), "{:?}", err);
        assert_eq!(transport.opens("mem://a"), 1);
        assert!(!dest.exists());
        assert!(dir_entries(dir.path()).is_empty());
        assert_eq!(fetcher.stats().downloads, 0);
    }

    #[test]
    fn test_verified_fetch_accepts_matching_digest() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"payload", 0));
        let fetcher = Fetcher::new(transport, quick_policy(1));
        let dest = dir.path().join("a.bin");
        let expected = digest_bytes(b"payload", HashAlgorithm::Xxh3_64).to_uppercase();

        fetcher
            .fetch_verified("mem://a", &dest, Some((HashAlgorithm::Xxh3_64, &expected)))
            .unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_remote_digest_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"abc", 1));
        let fetcher = Fetcher::new(transport, quick_policy(2));

        let digest = fetcher.remote_digest("mem://a", HashAlgorithm::Sha256).unwrap();

        assert_eq!(digest, digest_bytes(b"abc", HashAlgorithm::Sha256));
        assert!(dir_entries(dir.path()).is_empty());
        assert_eq!(fetcher.stats().remote_digests, 1);
        assert_eq!(fetcher.stats().downloads, 0);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FlakyTransport::new("mem://a", b"x", 0));
        let fetcher = Fetcher::new(transport.clone(), quick_policy(0));
        fetcher.fetch("mem://a", &dir.path().join("x")).unwrap();
        assert_eq!(transport.opens("mem://a"), 1);
    }
}
