//! Error types for gridded data.

use std::fmt;
use thiserror::Error;

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// East-west.
    Longitude,
    /// North-south.
    Latitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Longitude => f.write_str("Longitude"),
            Axis::Latitude => f.write_str("Latitude"),
        }
    }
}

/// One out-of-range input coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateViolation {
    /// Which input it came from.
    pub axis: Axis,
    /// Flat index within that input.
    pub index: usize,
    /// Offending value.
    pub value: f64,
}

/// Errors that can occur when building or querying grids.
#[derive(Debug, Error)]
pub enum GridError {
    /// One or more input coordinates are out of range.
    #[error("{}", describe_violations(.0))]
    CoordinateRange(Vec<CoordinateViolation>),

    /// Variable is not present in the grid.
    #[error("Unknown variable '{name}'. Options are: {}", available.join(", "))]
    UnknownVariable {
        /// Requested name.
        name: String,
        /// Names present in the grid.
        available: Vec<String>,
    },

    /// Array shape does not match the coordinate axes.
    #[error("Array '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Variable or buffer name.
        name: String,
        /// (rows, cols) required.
        expected: (usize, usize),
        /// (rows, cols) found.
        actual: (usize, usize),
    },

    /// Coordinate axis is empty, too short, or not strictly increasing.
    #[error("Invalid {axis} axis: {reason}")]
    InvalidAxis {
        /// Offending axis.
        axis: Axis,
        /// What was wrong.
        reason: String,
    },

    /// Boundary polyline is unusable.
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Radial profile parameters are out of range.
    #[error("Invalid radial profile: {0}")]
    InvalidProfile(String),
}

fn describe_violations(violations: &[CoordinateViolation]) -> String {
    let mut parts = Vec::new();
    for (axis, range) in [(Axis::Longitude, "[-180, 360]"), (Axis::Latitude, "[-90, 90]")] {
        let listed: Vec<String> = violations
            .iter()
            .filter(|v| v.axis == axis)
            .map(|v| format!("{} at index {}", v.value, v.index))
            .collect();
        if !listed.is_empty() {
            parts.push(format!(
                "{} values must be in range {}. Invalid values: {}",
                axis,
                range,
                listed.join(", ")
            ));
        }
    }
    parts.join("; ")
}
