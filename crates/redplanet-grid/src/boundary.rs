//! Piecewise-linear latitude threshold as a function of longitude.
//!
//! Used to classify points as north or south of a curve such as the Martian
//! crustal dichotomy. This is a 1-D threshold, not a point-in-polygon test:
//! it only works because the curve crosses every meridian exactly once, which
//! [`ThresholdBoundary::from_points`] enforces by requiring strictly
//! increasing longitudes.

use crate::coords::{self, Coordinates};
use crate::gridded::Sample;
use crate::{GridError, Result};

/// A closed curve `lat = f(lon)` over the full 360 degrees.
///
/// Control points are stored in the positive convention, with the first two
/// repeated at the end shifted by +360 so interpolation across the seam needs
/// no special case.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdBoundary {
    lon: Vec<f64>,
    lat: Vec<f64>,
    points: usize,
}

impl ThresholdBoundary {
    /// Build from `(lon, lat)` control points in the positive convention.
    ///
    /// Longitudes must be strictly increasing within `[0, 360]` and latitudes
    /// within `[-90, 90]`; at least two points are required.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < 2 {
            return Err(GridError::InvalidBoundary(format!(
                "need at least 2 control points, got {}",
                points.len()
            )));
        }
        for (i, &(lon, lat)) in points.iter().enumerate() {
            if !(0.0..=360.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
                return Err(GridError::InvalidBoundary(format!(
                    "control point {} ({}, {}) is out of range",
                    i, lon, lat
                )));
            }
        }
        if let Some(i) = points.windows(2).position(|w| !(w[0].0 < w[1].0)) {
            return Err(GridError::InvalidBoundary(format!(
                "longitudes must be strictly increasing; point {} ({}) is followed by {}",
                i,
                points[i].0,
                points[i + 1].0
            )));
        }

        let mut lon: Vec<f64> = points.iter().map(|p| p.0).collect();
        let mut lat: Vec<f64> = points.iter().map(|p| p.1).collect();
        lon.extend([points[0].0 + 360.0, points[1].0 + 360.0]);
        lat.extend([points[0].1, points[1].1]);

        Ok(Self {
            lon,
            lat,
            points: points.len(),
        })
    }

    /// Parse whitespace-separated `lon lat` rows. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut points = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = match fields.as_slice() {
                [lon, lat] => lon.parse::<f64>().ok().zip(lat.parse::<f64>().ok()),
                _ => None,
            };
            let point = parsed.ok_or_else(|| {
                GridError::InvalidBoundary(format!("line {}: expected two numbers, found '{}'", i + 1, line))
            })?;
            points.push(point);
        }
        Self::from_points(&points)
    }

    /// Control points without the wrap padding.
    pub fn control_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lon
            .iter()
            .copied()
            .zip(self.lat.iter().copied())
            .take(self.points)
    }

    /// Number of control points (excluding padding).
    pub fn len(&self) -> usize {
        self.points
    }

    /// Always false; construction requires two points.
    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    /// Threshold latitude at `lon` (either convention).
    pub fn threshold_latitude(&self, lon: f64) -> f64 {
        let mut x = coords::to_positive(&lon);
        if x < self.lon[0] {
            x += 360.0;
        }
        let i = self
            .lon
            .partition_point(|&a| a <= x)
            .saturating_sub(1)
            .min(self.lon.len() - 2);
        let (x1, x2) = (self.lon[i], self.lon[i + 1]);
        let (y1, y2) = (self.lat[i], self.lat[i + 1]);
        y1 + (x - x1) * (y2 - y1) / (x2 - x1)
    }

    /// Whether `(lon, lat)` lies on or north of the boundary.
    pub fn is_above(&self, lon: f64, lat: f64) -> Result<bool> {
        coords::validate(&lon, &lat)?;
        Ok(lat >= self.threshold_latitude(lon))
    }

    /// Classify every (lat, lon) pair; the result is shaped
    /// `(lat.len(), lon.len())`.
    pub fn classify<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A) -> Result<Sample<bool>> {
        coords::validate(lon, lat)?;
        let thresholds: Vec<f64> = lon
            .flatten_coords()
            .into_iter()
            .map(|x| self.threshold_latitude(x))
            .collect();
        let lats = lat.flatten_coords();
        Ok(Sample::from_fn(lats.len(), thresholds.len(), |r, c| lats[r] >= thresholds[c]))
    }
}
