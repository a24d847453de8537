//! Martian crustal dichotomy.

use crate::datasets::DICHOTOMY_COORDS;
use crate::Result;
use redplanet_cache::DatasetCache;
use redplanet_grid::{Coordinates, Squeezed, ThresholdBoundary};
use std::fs;
use std::path::Path;
use tracing::debug;

/// The dichotomy boundary as a latitude threshold per longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Dichotomy {
    boundary: ThresholdBoundary,
}

impl Dichotomy {
    /// Resolve and parse the `dichotomy_coords` dataset.
    pub fn load(cache: &DatasetCache) -> Result<Self> {
        let path = cache.resolve(DICHOTOMY_COORDS)?;
        Self::from_file(&path)
    }

    /// Parse a whitespace-separated `lon lat` file (positive longitudes).
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let boundary = ThresholdBoundary::parse(&text)?;
        debug!("Loaded {} dichotomy control points from {}", boundary.len(), path.display());
        Ok(Self { boundary })
    }

    /// Wrap an existing boundary.
    pub fn from_boundary(boundary: ThresholdBoundary) -> Self {
        Self { boundary }
    }

    /// Control points as `(lon, lat)` pairs, longitudes in `[0, 360]`.
    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.boundary.control_points().collect()
    }

    /// The underlying threshold curve.
    pub fn boundary(&self) -> &ThresholdBoundary {
        &self.boundary
    }

    /// Whether the point lies on or north of the dichotomy.
    pub fn is_above(&self, lon: f64, lat: f64) -> Result<bool> {
        Ok(self.boundary.is_above(lon, lat)?)
    }

    /// [`is_above`](Self::is_above) for every (lat, lon) pair, with
    /// singleton dimensions dropped.
    pub fn classify<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A) -> Result<Squeezed<bool>> {
        Ok(self.boundary.classify(lon, lat)?.squeeze())
    }
}
