//! # redplanet-grid
//!
//! Coordinate-indexed planetary rasters.
//!
//! A [`GriddedData`] pairs strictly increasing longitude and latitude axes
//! with one or more named 2-D arrays and answers point queries:
//!
//! - [`GriddedData::get_values`]: nearest grid node per axis, ties to the
//!   lower index.
//! - [`GriddedData::interpolate`]: bilinear interpolation between the four
//!   bracketing nodes.
//!
//! Inputs may use either longitude convention ([`LonConvention`]); they are
//! validated ([`validate`]) and converted to the grid's own convention first.
//! Results are shaped `(lat, lon)` and can be [squeezed](Sample::squeeze)
//! down to a scalar.
//!
//! [`geodesy`] measures and walks geodesics on the Mars reference ellipsoid,
//! and [`profile`] averages any point accessor over concentric rings built
//! from them.
//!
//! ## Wraparound padding
//!
//! Loaders pad every grid with [`GridBuilder::pad_wraparound`] (or read the
//! padding straight from disk and call [`GridBuilder::pad_axes`]): two extra
//! longitude columns copied from the first two (longitude is periodic) and
//! one extra latitude row copied from the last (latitude is clamped). Queries
//! at the eastern edge or the upper pole then need no special case.
//!
//! ## Example
//!
//! ```
//! use redplanet_grid::{Array2, GridBuilder, LonConvention};
//!
//! let lon: Vec<f64> = (0..4).map(|i| -180.0 + 90.0 * i as f64).collect();
//! let lat = vec![-45.0, 45.0];
//! let elevation = Array2::from_fn(2, 4, |r, c| (100 * r + c) as f64);
//!
//! let grid = GridBuilder::new(lon, lat, LonConvention::Signed)
//!     .variable("elevation", elevation)
//!     .pad_wraparound()?
//!     .build()?;
//!
//! // 270 (positive) is -90 (signed): column 1.
//! assert_eq!(grid.get_value(270.0, -45.0, "elevation")?, 1.0);
//! // Halfway between columns 0 and 1 on the first row.
//! assert_eq!(grid.interpolate_value(-135.0, -45.0, "elevation")?, 0.5);
//! # Ok::<(), redplanet_grid::GridError>(())
//! ```

mod array;
mod boundary;
pub mod coords;
mod error;
pub mod geodesy;
mod gridded;
pub mod profile;

pub use array::{Array2, Samples};
pub use boundary::ThresholdBoundary;
pub use coords::{to_positive, to_signed, validate, Coordinates, LonConvention};
pub use error::{Axis, CoordinateViolation, GridError};
pub use gridded::{GridBuilder, GriddedData, NodeSample, Sample, Squeezed};
pub use profile::{concentric_ring_coords, radial_profile, RadialProfile, RingSpacing, Rings};

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
