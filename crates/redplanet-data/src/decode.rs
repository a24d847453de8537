//! Raw raster readers and the spherical-harmonic expander boundary.

use crate::{DataError, Result};
use redplanet_grid::{Array2, GridBuilder, GridError, LonConvention};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

// ============================================================================
// Spherical-harmonic expansion (external)
// ============================================================================

/// What kind of coefficient file is being expanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpandKind {
    /// Scalar shape or potential coefficients (metres).
    Shape,
    /// Internal magnetic field coefficients; the expander returns the
    /// radial, theta, phi, total and potential components.
    Magnetic {
        /// Reference radius of the model in metres.
        reference_radius_m: f64,
    },
}

/// Parameters passed to a [`ShExpander`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandRequest {
    /// Maximum spherical-harmonic degree to use.
    pub lmax: u32,
    /// Coefficient file kind.
    pub kind: ExpandKind,
}

/// An expanded grid as produced by the external library.
///
/// Latitudes are decreasing (north first), longitudes are in `[0, 360)`.
/// Every variable is shaped `(lat.len(), lon.len())`.
#[derive(Debug, Clone)]
pub struct DecodedGrid {
    /// Latitudes, north first.
    pub lat: Vec<f64>,
    /// Longitudes, increasing from 0.
    pub lon: Vec<f64>,
    /// Named variables.
    pub variables: Vec<(String, Array2)>,
}

impl DecodedGrid {
    /// Remove and return the only variable of a scalar expansion.
    pub fn take_single(&mut self) -> Result<Array2> {
        if self.variables.len() != 1 {
            return Err(DataError::Expansion(format!(
                "expected a single variable, expander returned {}",
                self.variables.len()
            )));
        }
        let (_, array) = self.variables.remove(0);
        Ok(array)
    }

    /// Whether two expansions share the same axes.
    pub fn same_axes(&self, other: &DecodedGrid) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }

    /// Builder in increasing latitude, not yet padded.
    pub(crate) fn into_builder(self) -> GridBuilder {
        self.variables
            .into_iter()
            .fold(GridBuilder::new(self.lon, self.lat, LonConvention::Positive), |b, (name, array)| {
                b.variable(name, array)
            })
            .flip_latitude()
    }
}

/// Expands coefficient files into regular grids.
///
/// The numerical work lives outside this crate; implementations typically
/// wrap a native spherical-harmonic library.
pub trait ShExpander: Send + Sync {
    /// Expand the coefficients stored at `path`.
    fn expand(&self, path: &Path, request: &ExpandRequest) -> Result<DecodedGrid>;
}

// ============================================================================
// Raw little-endian rasters
// ============================================================================

/// Shape and regular axes of a raw raster file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterLayout {
    /// Number of latitude rows.
    pub rows: usize,
    /// Number of longitude columns.
    pub cols: usize,
    /// Longitude of column 0.
    pub lon_start: f64,
    /// Longitude spacing.
    pub lon_step: f64,
    /// Latitude of the southernmost row.
    pub lat_start: f64,
    /// Latitude spacing.
    pub lat_step: f64,
}

impl RasterLayout {
    /// Longitude of every column.
    pub fn lon_axis(&self) -> Vec<f64> {
        (0..self.cols).map(|i| self.lon_start + self.lon_step * i as f64).collect()
    }

    /// Latitude of every row, increasing.
    pub fn lat_axis(&self) -> Vec<f64> {
        (0..self.rows).map(|i| self.lat_start + self.lat_step * i as f64).collect()
    }
}

/// Row order of a raw raster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the southernmost.
    SouthFirst,
    /// First row is the northernmost.
    NorthFirst,
}

/// Read a row-major little-endian `int16` raster.
pub fn read_raw_i16(path: &Path, rows: usize, cols: usize) -> Result<Array2> {
    let values = read_raw(path, rows, cols, i16::from_le_bytes, None)?;
    Ok(Array2::from_i16(rows, cols, values)?)
}

/// Read a row-major little-endian `float64` raster.
pub fn read_raw_f64(path: &Path, rows: usize, cols: usize) -> Result<Array2> {
    let values = read_raw(path, rows, cols, f64::from_le_bytes, None)?;
    Ok(Array2::from_f64(rows, cols, values)?)
}

/// Read an `int16` raster straight into wraparound-padded form.
///
/// The result is `(rows + 1, cols + 2)` with rows south first, laid out as
/// [`Array2::pad_wraparound`] would produce, but filled in a single
/// allocation. Pair it with [`GridBuilder::pad_axes`].
pub fn read_padded_i16(path: &Path, layout: &RasterLayout, order: RowOrder) -> Result<Array2> {
    let values = read_raw(path, layout.rows, layout.cols, i16::from_le_bytes, Some(order))?;
    Ok(Array2::from_i16(layout.rows + 1, layout.cols + 2, values)?)
}

/// `float64` counterpart of [`read_padded_i16`].
pub fn read_padded_f64(path: &Path, layout: &RasterLayout, order: RowOrder) -> Result<Array2> {
    let values = read_raw(path, layout.rows, layout.cols, f64::from_le_bytes, Some(order))?;
    Ok(Array2::from_f64(layout.rows + 1, layout.cols + 2, values)?)
}

fn read_raw<T: Copy + Default, const N: usize>(
    path: &Path,
    rows: usize,
    cols: usize,
    decode: fn([u8; N]) -> T,
    padded: Option<RowOrder>,
) -> Result<Vec<T>> {
    let expected = (rows * cols * N) as u64;
    let actual = fs::metadata(path)?.len();
    if actual != expected {
        return Err(DataError::RasterSize {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    if padded.is_some() && (rows < 1 || cols < 2) {
        return Err(GridError::ShapeMismatch {
            name: "padding source".to_string(),
            expected: (1, 2),
            actual: (rows, cols),
        }
        .into());
    }

    let (stride, out_rows) = match padded {
        Some(_) => (cols + 2, rows + 1),
        None => (cols, rows),
    };
    let mut values = vec![T::default(); out_rows * stride];
    let mut reader = BufReader::new(File::open(path)?);
    let mut row = vec![0u8; cols * N];
    for r in 0..rows {
        reader.read_exact(&mut row)?;
        let target = match padded {
            Some(RowOrder::NorthFirst) => rows - 1 - r,
            _ => r,
        };
        let out = &mut values[target * stride..(target + 1) * stride];
        for (slot, bytes) in out.iter_mut().zip(row.chunks_exact(N)) {
            let mut buf = [0u8; N];
            buf.copy_from_slice(bytes);
            *slot = decode(buf);
        }
        if padded.is_some() {
            out[cols] = out[0];
            out[cols + 1] = out[1];
        }
    }
    if padded.is_some() {
        values.copy_within((rows - 1) * stride..rows * stride, rows * stride);
    }
    Ok(values)
}
