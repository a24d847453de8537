//! Geodesics on the Mars reference ellipsoid.
//!
//! Points are `(lon, lat)` pairs in degrees and distances are in metres.
//! Returned longitudes are in the signed convention.

use crate::{validate, Result};
use geographiclib_rs::{DirectGeodesic, Geodesic, InverseGeodesic};
use std::sync::OnceLock;

/// Semimajor axis of the Mars reference ellipsoid (Ardalan et al., 2009).
pub const MARS_SEMIMAJOR_M: f64 = 3_395_428.0;

/// Flattening of the Mars reference ellipsoid (Ardalan et al., 2009).
pub const MARS_FLATTENING: f64 = 0.005227617843759314;

fn mars() -> &'static Geodesic {
    static MARS: OnceLock<Geodesic> = OnceLock::new();
    MARS.get_or_init(|| Geodesic::new(MARS_SEMIMAJOR_M, MARS_FLATTENING))
}

/// Geodesic distance in metres between two points.
pub fn distance(start: (f64, f64), end: (f64, f64)) -> Result<f64> {
    validate(&[start.0, end.0], &[start.1, end.1])?;
    let s12: f64 = mars().inverse(start.1, start.0, end.1, end.0);
    Ok(s12)
}

/// Point reached by travelling `distance_m` from `start` along the geodesic
/// leaving at `azimuth` degrees clockwise from north.
pub fn move_forward(start: (f64, f64), azimuth: f64, distance_m: f64) -> Result<(f64, f64)> {
    validate(&start.0, &start.1)?;
    Ok(direct(start, azimuth, distance_m))
}

/// `n_samples` points at geodesic distance `radius_m` around a centre.
///
/// Azimuths run from 360 down to 0 degrees, so the first point is due north
/// and the ring is traced counter-clockwise. With `endpoint` the last point
/// repeats the first.
pub fn make_circle(lon: f64, lat: f64, radius_m: f64, n_samples: usize, endpoint: bool) -> Result<Vec<(f64, f64)>> {
    validate(&lon, &lat)?;
    let divisions = if endpoint { n_samples.saturating_sub(1) } else { n_samples };
    let step = if divisions == 0 { 0.0 } else { 360.0 / divisions as f64 };
    Ok((0..n_samples)
        .map(|i| direct((lon, lat), 360.0 - step * i as f64, radius_m))
        .collect())
}

fn direct(start: (f64, f64), azimuth: f64, distance_m: f64) -> (f64, f64) {
    let (lat2, lon2): (f64, f64) = mars().direct(start.1, start.0, azimuth, distance_m);
    (lon2, lat2)
}
