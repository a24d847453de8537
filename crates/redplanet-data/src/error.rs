//! Error types for the dataset accessors.

use redplanet_cache::CacheError;
use redplanet_grid::GridError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or querying a dataset.
#[derive(Debug, Error)]
pub enum DataError {
    /// Resolving the backing file failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Coordinate validation or grid lookup failed.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// I/O error reading a dataset file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be opened or an entry could not be read.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A model, element or quantity name is not one of the known options.
    #[error("Unknown {kind} '{name}'. Options are: {}", options.join(", "))]
    UnknownModel {
        /// What was being named ("topography model", "element", ...).
        kind: &'static str,
        /// The name that was given.
        name: String,
        /// Every valid name.
        options: Vec<String>,
    },

    /// A raw raster file does not hold exactly `rows * cols` samples.
    #[error("Raster {path} has {actual} bytes, expected {expected}")]
    RasterSize {
        /// File that was read.
        path: PathBuf,
        /// Byte count implied by the declared shape.
        expected: u64,
        /// Byte count on disk.
        actual: u64,
    },

    /// A text dataset has a malformed line.
    #[error("{file}, line {line}: {reason}")]
    Parse {
        /// File (or archive entry) being parsed.
        file: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// The dataset is stored as spherical-harmonic coefficients and no
    /// expander was supplied.
    #[error("No spherical-harmonic expander configured; cannot load {0}")]
    ExpanderUnavailable(String),

    /// The external expander reported a failure.
    #[error("Spherical-harmonic expansion failed: {0}")]
    Expansion(String),

    /// Volatile-free normalization was requested for a volatile element.
    #[error("Can't normalize a volatile element ('{0}') to a volatile-free (cl, h2o, s) basis")]
    NormalizeVolatile(String),
}

impl DataError {
    pub(crate) fn unknown<I, S>(kind: &'static str, name: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        DataError::UnknownModel {
            kind,
            name: name.to_string(),
            options: options.into_iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_lists_options() {
        let err = DataError::unknown("topography model", "DEM_1m", ["DEM_463m", "DEM_200m"]);
        assert_eq!(
            err.to_string(),
            "Unknown topography model 'DEM_1m'. Options are: DEM_463m, DEM_200m"
        );
    }

    #[test]
    fn test_cache_errors_pass_through() {
        let err: DataError = CacheError::NoHashDeclared("GRS".to_string()).into();
        assert!(matches!(err, DataError::Cache(CacheError::NoHashDeclared(_))));
    }
}
