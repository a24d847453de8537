//! Radial profiles: dataset values averaged over concentric geodesic rings.

use crate::geodesy::make_circle;
use crate::{GridError, Result};

/// Fewest points placed on any ring, including the zero-radius centre.
pub const MIN_POINTS_PER_RING: usize = 10;

/// How ring radii are chosen between the centre and the outer radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RingSpacing {
    /// Radii `0, d, 2d, ...` strictly below the outer radius (km).
    Distance(f64),
    /// This many radii evenly spaced from 0 to the outer radius inclusive.
    Count(usize),
}

/// Ring radii and the `(lon, lat)` points sampled on each ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Rings {
    /// Radius of each ring in km, increasing from 0.
    pub radii_km: Vec<f64>,
    /// Points on each ring, parallel to `radii_km`.
    pub coords: Vec<Vec<(f64, f64)>>,
}

/// Per-ring statistics of a sampled dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialProfile {
    /// Radius of each ring in km.
    pub radii_km: Vec<f64>,
    /// Mean value per ring.
    pub mean: Vec<f64>,
    /// Population standard deviation per ring.
    pub std: Vec<f64>,
    /// Every sampled value, per ring.
    pub values: Vec<Vec<f64>>,
}

/// Concentric rings around `(lon, lat)` out to `radius_km`.
///
/// Each ring of radius `r` gets `ceil(2 pi r / point_spacing_km)` points but
/// never fewer than [`MIN_POINTS_PER_RING`].
pub fn concentric_ring_coords(
    lon: f64,
    lat: f64,
    radius_km: f64,
    spacing: RingSpacing,
    point_spacing_km: f64,
) -> Result<Rings> {
    if radius_km.is_nan() || radius_km < 0.0 {
        return Err(GridError::InvalidProfile(format!("radius must be non-negative, got {}", radius_km)));
    }
    if point_spacing_km.is_nan() || point_spacing_km <= 0.0 {
        return Err(GridError::InvalidProfile(format!(
            "point spacing must be positive, got {}",
            point_spacing_km
        )));
    }
    let radii_km = ring_radii(radius_km, spacing)?;

    let mut coords = Vec::with_capacity(radii_km.len());
    for &r in &radii_km {
        let n = ((std::f64::consts::TAU * r / point_spacing_km).ceil() as usize).max(MIN_POINTS_PER_RING);
        coords.push(make_circle(lon, lat, r * 1e3, n, false)?);
    }
    Ok(Rings { radii_km, coords })
}

fn ring_radii(radius_km: f64, spacing: RingSpacing) -> Result<Vec<f64>> {
    match spacing {
        RingSpacing::Distance(d) if d > 0.0 => {
            let n = (radius_km / d).ceil() as usize;
            Ok((0..n).map(|i| i as f64 * d).collect())
        }
        RingSpacing::Distance(d) => Err(GridError::InvalidProfile(format!(
            "ring spacing must be positive, got {}",
            d
        ))),
        RingSpacing::Count(0) => Err(GridError::InvalidProfile("ring count must be at least 1".to_string())),
        RingSpacing::Count(1) => Ok(vec![0.0]),
        RingSpacing::Count(n) => {
            let step = radius_km / (n - 1) as f64;
            Ok((0..n).map(|i| i as f64 * step).collect())
        }
    }
}

/// Sample `accessor` at every ring point and summarize each ring.
///
/// The accessor takes `(lon, lat)`; its first error stops the profile.
pub fn radial_profile<F, E>(rings: &Rings, mut accessor: F) -> std::result::Result<RadialProfile, E>
where
    F: FnMut(f64, f64) -> std::result::Result<f64, E>,
{
    let mut values = Vec::with_capacity(rings.coords.len());
    for ring in &rings.coords {
        values.push(
            ring.iter()
                .map(|&(lon, lat)| accessor(lon, lat))
                .collect::<std::result::Result<Vec<f64>, E>>()?,
        );
    }
    let (mean, std): (Vec<f64>, Vec<f64>) = values.iter().map(|v| mean_std(v)).unzip();
    Ok(RadialProfile {
        radii_km: rings.radii_km.clone(),
        mean,
        std,
        values,
    })
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
