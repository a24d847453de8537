//! Immutable longitude/latitude grids with named variables.

use crate::array::Array2;
use crate::coords::{self, Coordinates, LonConvention};
use crate::error::Axis;
use crate::{GridError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Query result shaped `(len(lat), len(lon))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

/// A [`Sample`] with singleton dimensions removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Squeezed<T> {
    /// One latitude and one longitude.
    Scalar(T),
    /// Exactly one of the inputs had a single element.
    Vector(Vec<T>),
    /// Several latitudes (rows) by several longitudes (columns).
    Matrix(Vec<Vec<T>>),
}

impl<T: Copy> Sample<T> {
    pub(crate) fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                values.push(f(r, c));
            }
        }
        Self { rows, cols, values }
    }

    /// (latitudes, longitudes)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Value for latitude index `row` and longitude index `col`.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.values[row * self.cols + col]
    }

    /// Row-major values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The single value of a 1x1 sample.
    pub fn as_scalar(&self) -> Option<T> {
        (self.values.len() == 1).then(|| self.values[0])
    }

    /// Elementwise map, keeping the shape.
    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> Sample<U> {
        Sample {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    /// Elementwise combination of two samples taken at the same points.
    ///
    /// Fails with [`GridError::ShapeMismatch`] if the shapes differ.
    pub fn zip_with<U: Copy, V: Copy>(&self, other: &Sample<U>, mut f: impl FnMut(T, U) -> V) -> Result<Sample<V>> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                name: "sample".to_string(),
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(Sample {
            rows: self.rows,
            cols: self.cols,
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Drop singleton dimensions.
    pub fn squeeze(self) -> Squeezed<T> {
        match (self.rows, self.cols) {
            (1, 1) => Squeezed::Scalar(self.values[0]),
            (1, _) | (_, 1) => Squeezed::Vector(self.values),
            (_, cols) => Squeezed::Matrix(self.values.chunks(cols).map(<[T]>::to_vec).collect()),
        }
    }
}

/// Nearest-node values together with the grid nodes they were read from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSample {
    /// Longitude of the selected column for each input longitude, in the
    /// grid's convention.
    pub lon: Vec<f64>,
    /// Latitude of the selected row for each input latitude.
    pub lat: Vec<f64>,
    /// Values shaped `(lat.len(), lon.len())`.
    pub values: Sample<f64>,
}

/// Coordinate axes plus one or more equally shaped 2-D variables.
///
/// `lon` and `lat` are strictly increasing. Every variable is shaped
/// `(lat.len(), lon.len())`. Instances are immutable once built and can be
/// shared across threads by reference.
#[derive(Debug, Clone)]
pub struct GriddedData {
    lon: Vec<f64>,
    lat: Vec<f64>,
    convention: LonConvention,
    variables: BTreeMap<String, Array2>,
    metadata: BTreeMap<String, Value>,
}

impl GriddedData {
    /// Longitude axis, in [`convention`](Self::convention).
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude axis, increasing.
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Longitude convention of [`lon`](Self::lon).
    pub fn convention(&self) -> LonConvention {
        self.convention
    }

    /// Whether longitudes are in `[0, 360)`.
    pub fn is_positive_lon(&self) -> bool {
        self.convention.is_positive()
    }

    /// (lat, lon) lengths.
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Variable names, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// A variable, or [`GridError::UnknownVariable`] listing the options.
    pub fn variable(&self, name: &str) -> Result<&Array2> {
        self.variables.get(name).ok_or_else(|| GridError::UnknownVariable {
            name: name.to_string(),
            available: self.variable_names(),
        })
    }

    /// Free-form dataset metadata (units, provenance, model parameters).
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Nearest-neighbor values for every (lat, lon) pair.
    ///
    /// The result is shaped `(lat.len(), lon.len())`. Input longitudes may use
    /// either convention.
    pub fn get_values<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A, var: &str) -> Result<Sample<f64>> {
        let (array, lon_idx, lat_idx) = self.nearest(lon, lat, var)?;
        Ok(Sample::from_fn(lat_idx.len(), lon_idx.len(), |r, c| array.get(lat_idx[r], lon_idx[c])))
    }

    /// Like [`get_values`](Self::get_values), but also reports the grid node
    /// each value was taken from.
    ///
    /// Node longitudes are folded back into the grid's convention, so a hit
    /// on a wraparound column reports the column it duplicates.
    pub fn get_values_with_nodes<L: Coordinates, A: Coordinates>(
        &self,
        lon: &L,
        lat: &A,
        var: &str,
    ) -> Result<NodeSample> {
        let (array, lon_idx, lat_idx) = self.nearest(lon, lat, var)?;
        Ok(NodeSample {
            lon: lon_idx.iter().map(|&i| self.convention.normalize(self.lon[i])).collect(),
            lat: lat_idx.iter().map(|&j| self.lat[j]).collect(),
            values: Sample::from_fn(lat_idx.len(), lon_idx.len(), |r, c| array.get(lat_idx[r], lon_idx[c])),
        })
    }

    /// Nearest-neighbor value at a single point.
    pub fn get_value(&self, lon: f64, lat: f64, var: &str) -> Result<f64> {
        self.get_values(&lon, &lat, var).map(|s| s.get(0, 0))
    }

    /// Bilinear interpolation for every (lat, lon) pair.
    ///
    /// Expects a grid padded with [`GridBuilder::pad_wraparound`]. Longitudes
    /// west of the first column wrap into the padded eastern columns;
    /// latitudes beyond the axis are clamped to it.
    pub fn interpolate<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A, var: &str) -> Result<Sample<f64>> {
        let (array, lons, lats) = self.prepare(lon, lat, var)?;
        for (axis, values) in [(Axis::Longitude, &self.lon), (Axis::Latitude, &self.lat)] {
            if values.len() < 2 {
                return Err(GridError::InvalidAxis {
                    axis,
                    reason: "interpolation needs at least two values".to_string(),
                });
            }
        }
        let lon_w: Vec<(usize, f64)> = lons
            .iter()
            .map(|&x| {
                let x = if x < self.lon[0] { x + 360.0 } else { x };
                bracket(&self.lon, x)
            })
            .collect();
        let lat_w: Vec<(usize, f64)> = lats
            .iter()
            .map(|&y| bracket(&self.lat, y.clamp(self.lat[0], self.lat[self.lat.len() - 1])))
            .collect();

        Ok(Sample::from_fn(lat_w.len(), lon_w.len(), |r, c| {
            let (j, fy) = lat_w[r];
            let (i, fx) = lon_w[c];
            let q11 = array.get(j, i);
            let q21 = array.get(j, i + 1);
            let q12 = array.get(j + 1, i);
            let q22 = array.get(j + 1, i + 1);
            q11 * (1.0 - fx) * (1.0 - fy) + q21 * fx * (1.0 - fy) + q12 * (1.0 - fx) * fy + q22 * fx * fy
        }))
    }

    /// Bilinear interpolation at a single point.
    pub fn interpolate_value(&self, lon: f64, lat: f64, var: &str) -> Result<f64> {
        self.interpolate(&lon, &lat, var).map(|s| s.get(0, 0))
    }

    fn nearest<L: Coordinates, A: Coordinates>(
        &self,
        lon: &L,
        lat: &A,
        var: &str,
    ) -> Result<(&Array2, Vec<usize>, Vec<usize>)> {
        let (array, lons, lats) = self.prepare(lon, lat, var)?;
        let lon_idx = lons.iter().map(|&x| nearest_index(&self.lon, x)).collect();
        let lat_idx = lats.iter().map(|&y| nearest_index(&self.lat, y)).collect();
        Ok((array, lon_idx, lat_idx))
    }

    fn prepare<L: Coordinates, A: Coordinates>(
        &self,
        lon: &L,
        lat: &A,
        var: &str,
    ) -> Result<(&Array2, Vec<f64>, Vec<f64>)> {
        coords::validate(lon, lat)?;
        let array = self.variable(var)?;
        let lons = lon
            .flatten_coords()
            .into_iter()
            .map(|x| self.convention.normalize(x))
            .collect();
        Ok((array, lons, lat.flatten_coords()))
    }
}

/// Index of the grid line nearest to `x`; ties go to the lower index.
pub(crate) fn nearest_index(axis: &[f64], x: f64) -> usize {
    let n = axis.len();
    if n == 1 {
        return 0;
    }
    let i = axis.partition_point(|&a| a < x).clamp(1, n - 1);
    if (x - axis[i - 1]).abs() <= (axis[i] - x).abs() {
        i - 1
    } else {
        i
    }
}

/// Lower bracketing index and fractional offset toward the next line.
///
/// Uses the last line `<= x`, so a query on a node gets offset 0 and the node
/// value back exactly.
pub(crate) fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    let n = axis.len();
    let i = axis.partition_point(|&a| a <= x).saturating_sub(1).min(n - 2);
    let (x1, x2) = (axis[i], axis[i + 1]);
    (i, (x - x1) / (x2 - x1))
}

/// Assembles a [`GriddedData`] from decoded arrays.
///
/// Loaders apply the same fix-ups the query code relies on:
///
/// ```
/// use redplanet_grid::{Array2, GridBuilder, LonConvention};
///
/// // Decoder output: latitude decreasing, longitude in [0, 360).
/// let lon = vec![0.0, 90.0, 180.0, 270.0];
/// let lat = vec![45.0, -45.0];
/// let z = Array2::from_fn(2, 4, |r, c| (r * 4 + c) as f64);
///
/// let grid = GridBuilder::new(lon, lat, LonConvention::Positive)
///     .variable("z", z)
///     .flip_latitude()
///     .recenter(LonConvention::Signed)
///     .pad_wraparound()?
///     .build()?;
///
/// assert_eq!(grid.lon(), &[-180.0, -90.0, 0.0, 90.0, 180.0, 270.0]);
/// assert_eq!(grid.lat(), &[-45.0, 45.0, 135.0]);
/// # Ok::<(), redplanet_grid::GridError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GridBuilder {
    lon: Vec<f64>,
    lat: Vec<f64>,
    convention: LonConvention,
    variables: BTreeMap<String, Array2>,
    metadata: BTreeMap<String, Value>,
}

impl GridBuilder {
    /// Start from axes in their native order.
    pub fn new(lon: Vec<f64>, lat: Vec<f64>, convention: LonConvention) -> Self {
        Self {
            lon,
            lat,
            convention,
            variables: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a variable shaped `(lat.len(), lon.len())`.
    pub fn variable(mut self, name: impl Into<String>, array: Array2) -> Self {
        self.variables.insert(name.into(), array);
        self
    }

    /// Attach a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Reverse latitude order (and every variable's rows).
    pub fn flip_latitude(mut self) -> Self {
        self.lat.reverse();
        for array in self.variables.values_mut() {
            array.flip_rows();
        }
        self
    }

    /// Re-express longitudes in `convention` and rotate columns so the axis
    /// is increasing again.
    pub fn recenter(mut self, convention: LonConvention) -> Self {
        let converted: Vec<f64> = self.lon.iter().map(|&x| convention.normalize(x)).collect();
        let start = converted
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.lon = converted;
        self.lon.rotate_left(start);
        for array in self.variables.values_mut() {
            array.roll_cols(start);
        }
        self.convention = convention;
        self
    }

    /// Append `lon[-1] + dx`, `lon[-1] + 2dx` (copies of the first two
    /// columns) and `lat[-1] + dy` (copy of the last row), so queries at the
    /// upper edge of either axis need no special case.
    pub fn pad_wraparound(self) -> Result<Self> {
        let mut padded = self.pad_axes()?;
        let variables = std::mem::take(&mut padded.variables);
        for (name, array) in variables {
            padded.variables.insert(name, array.pad_wraparound()?);
        }
        Ok(padded)
    }

    /// Extend only the axes the way [`pad_wraparound`](Self::pad_wraparound)
    /// does. Variables must already carry the padding, either added after
    /// this call or read pre-padded from disk.
    pub fn pad_axes(mut self) -> Result<Self> {
        for (axis, values) in [(Axis::Longitude, &self.lon), (Axis::Latitude, &self.lat)] {
            if values.len() < 2 {
                return Err(GridError::InvalidAxis {
                    axis,
                    reason: "at least two values are needed for padding".to_string(),
                });
            }
        }
        let n = self.lon.len();
        let dx = self.lon[n - 1] - self.lon[n - 2];
        let last = self.lon[n - 1];
        self.lon.extend([last + dx, last + 2.0 * dx]);

        let m = self.lat.len();
        let dy = self.lat[m - 1] - self.lat[m - 2];
        self.lat.push(self.lat[m - 1] + dy);
        Ok(self)
    }

    /// Validate axes and shapes and freeze the grid.
    pub fn build(self) -> Result<GriddedData> {
        check_axis(Axis::Longitude, &self.lon)?;
        check_axis(Axis::Latitude, &self.lat)?;
        let expected = (self.lat.len(), self.lon.len());
        for (name, array) in &self.variables {
            if array.shape() != expected {
                return Err(GridError::ShapeMismatch {
                    name: name.clone(),
                    expected,
                    actual: array.shape(),
                });
            }
        }
        debug!(
            "Built grid {}x{} ({:?} longitude) with variables {:?}",
            expected.0,
            expected.1,
            self.convention,
            self.variables.keys().collect::<Vec<_>>()
        );
        Ok(GriddedData {
            lon: self.lon,
            lat: self.lat,
            convention: self.convention,
            variables: self.variables,
            metadata: self.metadata,
        })
    }
}

fn check_axis(axis: Axis, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(GridError::InvalidAxis {
            axis,
            reason: "axis is empty".to_string(),
        });
    }
    if let Some(i) = values.windows(2).position(|w| !(w[0] < w[1])) {
        return Err(GridError::InvalidAxis {
            axis,
            reason: format!(
                "values must be strictly increasing ({} at index {} followed by {})",
                values[i],
                i,
                values[i + 1]
            ),
        });
    }
    Ok(())
}
