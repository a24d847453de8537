//! Longitude conventions and coordinate validation.
//!
//! Two encodings of the same physical longitude are in use:
//! - positive, `[0, 360)`
//! - signed, `[-180, 180)`
//!
//! Conversions use Euclidean remainder, so negative inputs wrap correctly
//! (`to_positive(-10.0) == 350.0`). Every function here is shape-preserving
//! over the [`Coordinates`] trait: a scalar comes back as a scalar, a
//! `Vec<Vec<f64>>` comes back as a `Vec<Vec<f64>>` of the same shape.

use crate::error::{Axis, CoordinateViolation};
use crate::{GridError, Result};
use serde::{Deserialize, Serialize};

/// Inclusive range accepted for input longitudes (either convention).
pub const LON_RANGE: (f64, f64) = (-180.0, 360.0);

/// Inclusive range accepted for input latitudes.
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);

/// Longitude encoding used by a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LonConvention {
    /// `[0, 360)`
    Positive,
    /// `[-180, 180)`
    Signed,
}

impl LonConvention {
    /// Convert one longitude into this convention.
    pub fn normalize(self, lon: f64) -> f64 {
        match self {
            LonConvention::Positive => positive(lon),
            LonConvention::Signed => signed(lon),
        }
    }

    /// Whether this is the `[0, 360)` convention.
    pub fn is_positive(self) -> bool {
        self == LonConvention::Positive
    }
}

// Values already in range are returned untouched so grid nodes survive a
// conversion bit-for-bit.
fn signed(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon - 180.0).rem_euclid(360.0) - 180.0
    }
}

fn positive(lon: f64) -> f64 {
    if (0.0..360.0).contains(&lon) {
        lon
    } else {
        lon.rem_euclid(360.0)
    }
}

/// Scalars and nested collections of coordinates.
pub trait Coordinates: Sized {
    /// Apply `f` to every element, keeping the shape.
    fn map_coords<F: Fn(f64) -> f64>(&self, f: &F) -> Self;

    /// Visit every element in row-major order.
    fn visit_coords<F: FnMut(f64)>(&self, f: &mut F);

    /// All elements, flattened in row-major order.
    fn flatten_coords(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.visit_coords(&mut |v| out.push(v));
        out
    }
}

impl Coordinates for f64 {
    fn map_coords<F: Fn(f64) -> f64>(&self, f: &F) -> Self {
        f(*self)
    }

    fn visit_coords<F: FnMut(f64)>(&self, f: &mut F) {
        f(*self)
    }
}

impl<T: Coordinates> Coordinates for Vec<T> {
    fn map_coords<F: Fn(f64) -> f64>(&self, f: &F) -> Self {
        self.iter().map(|v| v.map_coords(f)).collect()
    }

    fn visit_coords<F: FnMut(f64)>(&self, f: &mut F) {
        for v in self {
            v.visit_coords(f);
        }
    }
}

impl<T: Coordinates, const N: usize> Coordinates for [T; N] {
    fn map_coords<F: Fn(f64) -> f64>(&self, f: &F) -> Self {
        std::array::from_fn(|i| self[i].map_coords(f))
    }

    fn visit_coords<F: FnMut(f64)>(&self, f: &mut F) {
        for v in self {
            v.visit_coords(f);
        }
    }
}

/// Convert longitudes to `[-180, 180)`.
pub fn to_signed<C: Coordinates>(lon: &C) -> C {
    lon.map_coords(&signed)
}

/// Convert longitudes to `[0, 360)`.
pub fn to_positive<C: Coordinates>(lon: &C) -> C {
    lon.map_coords(&positive)
}

/// Check every longitude lies in `[-180, 360]` and every latitude in
/// `[-90, 90]`. NaN counts as out of range.
///
/// All violations are reported together, each with its flat index.
pub fn validate<L: Coordinates, A: Coordinates>(lon: &L, lat: &A) -> Result<()> {
    let mut violations = Vec::new();
    collect_violations(lon, Axis::Longitude, LON_RANGE, &mut violations);
    collect_violations(lat, Axis::Latitude, LAT_RANGE, &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(GridError::CoordinateRange(violations))
    }
}

fn collect_violations<C: Coordinates>(
    values: &C,
    axis: Axis,
    (lo, hi): (f64, f64),
    out: &mut Vec<CoordinateViolation>,
) {
    let mut index = 0;
    values.visit_coords(&mut |value| {
        if !(lo..=hi).contains(&value) {
            out.push(CoordinateViolation { axis, index, value });
        }
        index += 1;
    });
}
