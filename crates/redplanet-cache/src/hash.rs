//! Streaming digests over local files and remote byte streams.
//!
//! Every digest is computed in fixed [`CHUNK_SIZE`] reads, so memory use does
//! not depend on the size of the source.

use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// Read size for all hashing and streaming.
pub const CHUNK_SIZE: usize = 8192;

/// Supported digest algorithms.
///
/// Variants are declared fastest-first, so the derived `Ord` doubles as the
/// preference order when a descriptor declares several digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// 64-bit XXH3, rendered as 16 lowercase hex characters.
    #[serde(rename = "xxh3_64")]
    Xxh3_64,
    /// SHA-256, rendered as 64 lowercase hex characters.
    #[serde(rename = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// All supported algorithms, fastest first.
    pub fn supported() -> &'static [HashAlgorithm] {
        &[HashAlgorithm::Xxh3_64, HashAlgorithm::Sha256]
    }

    /// Canonical name as used in registry files.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Xxh3_64 => "xxh3_64",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Start an incremental digest for this algorithm.
    pub fn hasher(&self) -> Hasher {
        match self {
            HashAlgorithm::Xxh3_64 => Hasher::Xxh3(Box::new(Xxh3::new())),
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        HashAlgorithm::supported()
            .iter()
            .copied()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| CacheError::UnsupportedAlgorithm(s.to_string()))
    }
}

/// Incremental digest state.
pub enum Hasher {
    /// XXH3 state is large, keep it off the stack.
    Xxh3(Box<Xxh3>),
    /// SHA-256 state.
    Sha256(Sha256),
}

impl Hasher {
    /// Feed more bytes.
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Hasher::Xxh3(h) => h.update(bytes),
            Hasher::Sha256(h) => h.update(bytes),
        }
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Xxh3(h) => format!("{:016x}", h.digest()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Digest everything readable from `reader`.
pub fn digest_reader<R: Read + ?Sized>(reader: &mut R, algorithm: HashAlgorithm) -> Result<String> {
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Digest a local file.
///
/// Fails with [`CacheError::SourceUnavailable`] if `path` is not an existing file.
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    if !path.is_file() {
        return Err(CacheError::SourceUnavailable(path.to_path_buf()));
    }
    let mut file = File::open(path)?;
    digest_reader(&mut file, algorithm)
}

/// Digest an in-memory buffer.
pub fn digest_bytes(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(bytes);
    hasher.finalize_hex()
}

/// Compare two hex digests, ignoring case.
pub(crate) fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual)
}
