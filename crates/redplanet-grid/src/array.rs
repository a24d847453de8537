//! Dense row-major 2-D sample arrays.

use crate::{GridError, Result};

/// Sample storage. Large rasters keep their native integer type.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 16-bit signed integers (elevation rasters).
    I16(Vec<i16>),
    /// Single precision.
    F32(Vec<f32>),
    /// Double precision.
    F64(Vec<f64>),
}

/// Run a generic expression against whichever vector backs `$samples`.
macro_rules! each_samples {
    ($samples:expr, $v:ident => $body:expr) => {
        match $samples {
            Samples::I16($v) => $body,
            Samples::F32($v) => $body,
            Samples::F64($v) => $body,
        }
    };
}

/// Like `each_samples!`, rewrapping the result in the same variant.
macro_rules! map_samples {
    ($samples:expr, $v:ident => $body:expr) => {
        match $samples {
            Samples::I16($v) => Samples::I16($body),
            Samples::F32($v) => Samples::F32($body),
            Samples::F64($v) => Samples::F64($body),
        }
    };
}

impl Samples {
    /// Number of samples.
    pub fn len(&self) -> usize {
        each_samples!(self, v => v.len())
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn get(&self, i: usize) -> f64 {
        match self {
            Samples::I16(v) => v[i] as f64,
            Samples::F32(v) => v[i] as f64,
            Samples::F64(v) => v[i],
        }
    }
}

/// A `rows x cols` array; rows are latitudes, columns longitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct Array2 {
    rows: usize,
    cols: usize,
    samples: Samples,
}

impl Array2 {
    /// Wrap `samples` laid out row-major.
    pub fn new(rows: usize, cols: usize, samples: Samples) -> Result<Self> {
        if samples.len() != rows * cols {
            return Err(GridError::ShapeMismatch {
                name: "samples".to_string(),
                expected: (rows, cols),
                actual: (samples.len() / cols.max(1), cols),
            });
        }
        Ok(Self { rows, cols, samples })
    }

    /// Double precision array.
    pub fn from_f64(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        Self::new(rows, cols, Samples::F64(values))
    }

    /// Single precision array.
    pub fn from_f32(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        Self::new(rows, cols, Samples::F32(values))
    }

    /// 16-bit integer array.
    pub fn from_i16(rows: usize, cols: usize, values: Vec<i16>) -> Result<Self> {
        Self::new(rows, cols, Samples::I16(values))
    }

    /// Build a double precision array from a function of (row, col).
    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                values.push(f(r, c));
            }
        }
        Self {
            rows,
            cols,
            samples: Samples::F64(values),
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Underlying storage.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Sample at (row, col), widened to `f64`.
    ///
    /// # Panics
    /// Panics if either index is out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "({}, {}) outside {:?}", row, col, self.shape());
        self.samples.get(row * self.cols + col)
    }

    /// One row, widened to `f64`.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.cols).map(|c| self.get(row, c)).collect()
    }

    /// Elementwise map into a double precision array.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Array2 {
        Array2::from_fn(self.rows, self.cols, |r, c| f(self.get(r, c)))
    }

    /// Elementwise combination of two equally shaped arrays.
    pub fn zip_with(&self, other: &Array2, f: impl Fn(f64, f64) -> f64) -> Result<Array2> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                name: "operand".to_string(),
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(Array2::from_fn(self.rows, self.cols, |r, c| f(self.get(r, c), other.get(r, c))))
    }

    /// Reverse the row order in place.
    pub fn flip_rows(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        each_samples!(&mut self.samples, v => flip_rows(v, rows, cols));
    }

    /// Rotate every row left by `shift` columns in place.
    pub fn roll_cols(&mut self, shift: usize) {
        let cols = self.cols;
        if cols == 0 || shift % cols == 0 {
            return;
        }
        each_samples!(&mut self.samples, v => roll_cols(v, cols, shift % cols));
    }

    /// Append two columns copied from columns 0 and 1 (periodic longitude)
    /// and then one row copied from the last row (clamped latitude).
    ///
    /// Requires at least 2 columns and 1 row.
    pub fn pad_wraparound(self) -> Result<Array2> {
        if self.cols < 2 || self.rows < 1 {
            return Err(GridError::ShapeMismatch {
                name: "padding source".to_string(),
                expected: (1, 2),
                actual: self.shape(),
            });
        }
        let (rows, cols) = (self.rows, self.cols);
        let samples = map_samples!(self.samples, v => pad_wraparound(v, rows, cols));
        Ok(Array2 {
            rows: rows + 1,
            cols: cols + 2,
            samples,
        })
    }
}

fn flip_rows<T>(v: &mut [T], rows: usize, cols: usize) {
    for r in 0..rows / 2 {
        let mirror = rows - 1 - r;
        let (top, bottom) = v.split_at_mut(mirror * cols);
        top[r * cols..(r + 1) * cols].swap_with_slice(&mut bottom[..cols]);
    }
}

fn roll_cols<T>(v: &mut [T], cols: usize, shift: usize) {
    for row in v.chunks_exact_mut(cols) {
        row.rotate_left(shift);
    }
}

fn pad_wraparound<T: Copy>(v: Vec<T>, rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity((rows + 1) * (cols + 2));
    for row in v.chunks_exact(cols).take(rows) {
        out.extend_from_slice(row);
        out.extend_from_slice(&row[..2]);
    }
    let last = out.len() - (cols + 2);
    out.extend_from_within(last..);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(rows: usize, cols: usize) -> Array2 {
        Array2::from_fn(rows, cols, |r, c| (r * 10 + c) as f64)
    }

    #[test]
    fn test_shape_check() {
        assert!(Array2::from_f64(2, 3, vec![0.0; 6]).is_ok());
        assert!(matches!(
            Array2::from_i16(2, 3, vec![0; 5]),
            Err(GridError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_flip_rows() {
        let mut a = numbered(3, 2);
        a.flip_rows();
        assert_eq!(a.row(0), vec![20.0, 21.0]);
        assert_eq!(a.row(1), vec![10.0, 11.0]);
        assert_eq!(a.row(2), vec![0.0, 1.0]);
    }

    #[test]
    fn test_roll_cols() {
        let mut a = Array2::from_i16(2, 4, vec![0, 1, 2, 3, 10, 11, 12, 13]).unwrap();
        a.roll_cols(1);
        assert_eq!(a.row(0), vec![1.0, 2.0, 3.0, 0.0]);
        assert_eq!(a.row(1), vec![11.0, 12.0, 13.0, 10.0]);
        a.roll_cols(4);
        assert_eq!(a.row(0), vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_pad_wraparound_layout() {
        let padded = numbered(2, 3).pad_wraparound().unwrap();
        assert_eq!(padded.shape(), (3, 5));
        assert_eq!(padded.row(0), vec![0.0, 1.0, 2.0, 0.0, 1.0]);
        assert_eq!(padded.row(1), vec![10.0, 11.0, 12.0, 10.0, 11.0]);
        assert_eq!(padded.row(2), padded.row(1));
    }

    #[test]
    fn test_pad_keeps_sample_type() {
        let padded = Array2::from_i16(1, 2, vec![7, 8]).unwrap().pad_wraparound().unwrap();
        assert_eq!(padded.samples(), &Samples::I16(vec![7, 8, 7, 8, 7, 8, 7, 8]));
    }

    #[test]
    fn test_pad_needs_two_columns() {
        assert!(numbered(3, 1).pad_wraparound().is_err());
    }

    #[test]
    fn test_zip_with() {
        let a = numbered(2, 2);
        let b = a.map(|v| v * 2.0);
        let diff = b.zip_with(&a, |x, y| x - y).unwrap();
        assert_eq!(diff, a);
        assert!(a.zip_with(&numbered(3, 2), |x, _| x).is_err());
    }
}
