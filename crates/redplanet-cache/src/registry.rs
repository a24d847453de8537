//! Static dataset registry.

use crate::hash::HashAlgorithm;
use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything needed to fetch and verify one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Logical name. Filled from the map key when loaded from YAML.
    #[serde(default)]
    pub name: String,
    /// Remote location.
    pub url: String,
    /// File name inside the cache subpath.
    pub filename: String,
    /// Directory relative to the cache root.
    pub cache_subpath: PathBuf,
    /// Declared digests, keyed by algorithm.
    pub hashes: BTreeMap<HashAlgorithm, String>,
}

impl DatasetDescriptor {
    /// Create a descriptor without any declared digest.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        filename: impl Into<String>,
        cache_subpath: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            filename: filename.into(),
            cache_subpath: cache_subpath.into(),
            hashes: BTreeMap::new(),
        }
    }

    /// Add a declared digest.
    pub fn with_hash(mut self, algorithm: HashAlgorithm, digest: impl Into<String>) -> Self {
        self.hashes.insert(algorithm, digest.into());
        self
    }

    /// The fastest declared algorithm and its digest.
    pub fn select_hash(&self) -> Result<(HashAlgorithm, &str)> {
        self.hashes
            .iter()
            .find(|(_, digest)| !digest.trim().is_empty())
            .map(|(alg, digest)| (*alg, digest.as_str()))
            .ok_or_else(|| CacheError::NoHashDeclared(self.name.clone()))
    }
}

/// Name to descriptor lookup.
pub trait Registry: Send + Sync {
    /// Descriptor for `name`, if known.
    fn get(&self, name: &str) -> Option<DatasetDescriptor>;

    /// Every known name, sorted.
    fn names(&self) -> Vec<String>;

    /// Descriptor for `name`, or [`CacheError::DatasetNotFound`] listing the known names.
    fn lookup(&self, name: &str) -> Result<DatasetDescriptor> {
        self.get(name).ok_or_else(|| CacheError::DatasetNotFound {
            name: name.to_string(),
            known: self.names(),
        })
    }
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn get(&self, name: &str) -> Option<DatasetDescriptor> {
        (**self).get(name)
    }

    fn names(&self) -> Vec<String> {
        (**self).names()
    }
}

/// In-memory registry, typically built once at startup.
///
/// YAML form is a map from name to descriptor:
///
/// ```yaml
/// dichotomy_coords:
///   url: https://example.org/dichotomy.txt
///   filename: dichotomy_coordinates-JAH-0-360.txt
///   cache_subpath: Crust/dichotomy
///   hashes:
///     sha256: 42f2b9f32c9e9100ef4a9977171a54654c3bf25602555945405a93ca45ac6bb2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegistry {
    entries: BTreeMap<String, DatasetDescriptor>,
}

impl StaticRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a descriptor.
    pub fn insert(&mut self, descriptor: DatasetDescriptor) {
        self.entries.insert(descriptor.name.clone(), descriptor);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, descriptor: DatasetDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Parse a YAML map of descriptors.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let parsed: BTreeMap<String, DatasetDescriptor> = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for (name, mut descriptor) in parsed {
            descriptor.name = name;
            registry.insert(descriptor);
        }
        Ok(registry)
    }

    /// Load a YAML file of descriptors.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Overlay `other` on top of this registry; its entries win.
    pub fn merge(mut self, other: StaticRegistry) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetDescriptor> {
        self.entries.values()
    }
}

impl Registry for StaticRegistry {
    fn get(&self, name: &str) -> Option<DatasetDescriptor> {
        self.entries.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> DatasetDescriptor {
        DatasetDescriptor::new(name, format!("https://host/{}", name), format!("{}.bin", name), "sub")
    }

    #[test]
    fn test_lookup_unknown_lists_names() {
        let registry = StaticRegistry::new()
            .with(descriptor("beta").with_hash(HashAlgorithm::Sha256, "00"))
            .with(descriptor("alpha").with_hash(HashAlgorithm::Sha256, "00"));

        match registry.lookup("gamma") {
            Err(CacheError::DatasetNotFound { name, known }) => {
                assert_eq!(name, "gamma");
                assert_eq!(known, vec!["alpha".to_string(), "beta".to_string()]);
            }
            other => panic!("expected DatasetNotFound, got {:?}", other),
        }

        let message = registry.lookup("gamma").unwrap_err().to_string();
        assert!(message.contains("alpha, beta"), "{}", message);
    }

    #[test]
    fn test_select_hash_prefers_fastest() {
        let d = descriptor("a")
            .with_hash(HashAlgorithm::Sha256, "aa")
            .with_hash(HashAlgorithm::Xxh3_64, "bb");
        assert_eq!(d.select_hash().unwrap(), (HashAlgorithm::Xxh3_64, "bb"));

        let d = descriptor("a").with_hash(HashAlgorithm::Sha256, "aa");
        assert_eq!(d.select_hash().unwrap(), (HashAlgorithm::Sha256, "aa"));
    }

    #[test]
    fn test_select_hash_skips_blank_and_fails_when_empty() {
        let d = descriptor("a")
            .with_hash(HashAlgorithm::Xxh3_64, " ")
            .with_hash(HashAlgorithm::Sha256, "aa");
        assert_eq!(d.select_hash().unwrap().0, HashAlgorithm::Sha256);

        assert!(matches!(
            descriptor("empty").select_hash(),
            Err(CacheError::NoHashDeclared(name)) if name == "empty"
        ));
    }

    #[test]
    fn test_yaml_registry() {
        let yaml = r#"
GRS:
  url: https://example.org/grs
  filename: grs.zip
  cache_subpath: GRS
  hashes:
    sha256: "abcd"
    xxh3_64: "0123456789abcdef"
"#;
        let registry = StaticRegistry::from_yaml_str(yaml).unwrap();
        let d = registry.lookup("GRS").unwrap();
        assert_eq!(d.name, "GRS");
        assert_eq!(d.cache_subpath, PathBuf::from("GRS"));
        assert_eq!(d.hashes.len(), 2);
    }

    #[test]
    fn test_yaml_rejects_unknown_algorithm() {
        let yaml = "X:\n  url: u\n  filename: f\n  cache_subpath: s\n  hashes:\n    md5: aa\n";
        assert!(matches!(StaticRegistry::from_yaml_str(yaml), Err(CacheError::Yaml(_))));
    }

    #[test]
    fn test_merge_overrides() {
        let base = StaticRegistry::new().with(descriptor("a")).with(descriptor("b"));
        let mut replacement = descriptor("b");
        replacement.url = "https://mirror/b".to_string();
        let merged = base.merge(StaticRegistry::new().with(replacement));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.lookup("b").unwrap().url, "https://mirror/b");
    }
}
