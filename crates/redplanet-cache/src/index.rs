//! Composite-key index datasets.
//!
//! Some datasets come in hundreds of variants (one file per model
//! parameter combination). Rather than listing each in the static registry,
//! a small comma-separated index file, itself an ordinary cached dataset,
//! maps each key to a download code and its digests:
//!
//! ```text
//! model_name,box_download_code,sha256
//! Khan2022-39-2900-2900,0a1b2c...,9f86d0...
//! ```
//!
//! Resolution is two-hop: resolve the index file, look up the key to derive a
//! [`DatasetDescriptor`], then resolve that descriptor.

use crate::hash::HashAlgorithm;
use crate::{CacheError, DatasetDescriptor, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// How an index file's rows map onto descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    /// Static registry name of the index file itself.
    pub index_dataset: String,
    /// Column holding the composite key.
    pub key_column: String,
    /// Column holding the remote download code.
    pub code_column: String,
    /// Remote URL with a `{code}` placeholder.
    pub url_template: String,
    /// Logical dataset name with a `{key}` placeholder.
    pub name_template: String,
    /// Local file name with a `{key}` placeholder.
    pub filename_template: String,
    /// Directory relative to the cache root.
    pub cache_subpath: PathBuf,
}

impl IndexLayout {
    /// Dataset name derived for `key`.
    pub fn dataset_name(&self, key: &str) -> String {
        self.name_template.replace("{key}", key)
    }
}

#[derive(Debug, Clone)]
struct IndexRow {
    code: String,
    hashes: BTreeMap<HashAlgorithm, String>,
}

/// A parsed index file.
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    name: String,
    rows: HashMap<String, IndexRow>,
}

impl DatasetIndex {
    /// Parse index text. Columns named after a supported hash algorithm are
    /// read as digests; other unknown columns are ignored.
    pub fn parse(text: &str, layout: &IndexLayout) -> Result<Self> {
        let index = layout.index_dataset.clone();
        let invalid = |line: usize, reason: String| CacheError::InvalidIndex {
            index: index.clone(),
            line,
            reason,
        };

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| invalid(1, "empty index".to_string()))?;
        let columns: Vec<String> = split_fields(header).map(str::to_string).collect();

        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| invalid(header_line, format!("missing column '{}'", name)))
        };
        let key_col = position(&layout.key_column)?;
        let code_col = position(&layout.code_column)?;
        let hash_cols: Vec<(usize, HashAlgorithm)> = columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.parse::<HashAlgorithm>().ok().map(|alg| (i, alg)))
            .collect();
        if hash_cols.is_empty() {
            return Err(invalid(header_line, "no hash column".to_string()));
        }

        let mut rows = HashMap::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = split_fields(line).collect();
            if fields.len() != columns.len() {
                return Err(invalid(
                    line_no,
                    format!("expected {} fields, found {}", columns.len(), fields.len()),
                ));
            }
            let key = fields[key_col].to_string();
            let hashes = hash_cols
                .iter()
                .filter(|(i, _)| !fields[*i].is_empty())
                .map(|(i, alg)| (*alg, fields[*i].to_string()))
                .collect();
            let row = IndexRow {
                code: fields[code_col].to_string(),
                hashes,
            };
            if rows.insert(key.clone(), row).is_some() {
                return Err(invalid(line_no, format!("duplicate key '{}'", key)));
            }
        }

        Ok(Self {
            name: layout.index_dataset.clone(),
            rows,
        })
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rows.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Descriptor for `key`, or [`CacheError::IndexEntryNotFound`].
    pub fn descriptor(&self, key: &str, layout: &IndexLayout) -> Result<DatasetDescriptor> {
        let row = self.rows.get(key).ok_or_else(|| CacheError::IndexEntryNotFound {
            index: self.name.clone(),
            key: key.to_string(),
        })?;
        Ok(DatasetDescriptor {
            name: layout.dataset_name(key),
            url: layout.url_template.replace("{code}", &row.code),
            filename: layout.filename_template.replace("{key}", key),
            cache_subpath: layout.cache_subpath.clone(),
            hashes: row.hashes.clone(),
        })
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(|f| f.trim().trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> IndexLayout {
        IndexLayout {
            index_dataset: "moho_registry".to_string(),
            key_column: "model_name".to_string(),
            code_column: "box_download_code".to_string(),
            url_template: "https://host/static/{code}".to_string(),
            name_template: "Moho-Mars-{key}".to_string(),
            filename_template: "Moho-Mars-{key}.sh".to_string(),
            cache_subpath: PathBuf::from("Crust/moho"),
        }
    }

    const INDEX: &str = "\
model_name,box_download_code,sha256,notes
Khan2022-39-2900-2900,abc123,ffee,first
\"DWAK-45-2900-3100\",def456,0011,

";

    #[test]
    fn test_parse_and_derive_descriptor() {
        let index = DatasetIndex::parse(INDEX, &layout()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.keys(), vec!["DWAK-45-2900-3100", "Khan2022-39-2900-2900"]);

        let d = index.descriptor("Khan2022-39-2900-2900", &layout()).unwrap();
        assert_eq!(d.name, "Moho-Mars-Khan2022-39-2900-2900");
        assert_eq!(d.url, "https://host/static/abc123");
        assert_eq!(d.filename, "Moho-Mars-Khan2022-39-2900-2900.sh");
        assert_eq!(d.hashes.get(&HashAlgorithm::Sha256).map(String::as_str), Some("ffee"));
    }

    #[test]
    fn test_missing_key() {
        let index = DatasetIndex::parse(INDEX, &layout()).unwrap();
        match index.descriptor("nope", &layout()) {
            Err(CacheError::IndexEntryNotFound { index, key }) => {
                assert_eq!(index, "moho_registry");
                assert_eq!(key, "nope");
            }
            other => panic!("expected IndexEntryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let err = DatasetIndex::parse("name,sha256\na,b\n", &layout()).unwrap_err();
        assert!(matches!(err, CacheError::InvalidIndex { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_ragged_row() {
        let text = "model_name,box_download_code,sha256\na,b\n";
        let err = DatasetIndex::parse(text, &layout()).unwrap_err();
        assert!(matches!(err, CacheError::InvalidIndex { line: 2, .. }), "{:?}", err);
    }

    #[test]
    fn test_duplicate_key() {
        let text = "model_name,box_download_code,sha256\na,b,c\na,d,e\n";
        assert!(DatasetIndex::parse(text, &layout()).is_err());
    }
}
