//! Crustal magnetic field from spherical-harmonic models.

use crate::datasets::LANGLAIS_2019;
use crate::decode::{DecodedGrid, ExpandKind, ExpandRequest, ShExpander};
use crate::{DataError, Result};
use redplanet_cache::DatasetCache;
use redplanet_grid::{Coordinates, GriddedData, Sample};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Default expansion degree for [`MagModel::Langlais2019`].
pub const DEFAULT_MAG_LMAX: u32 = 134;

/// Available magnetic field models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagModel {
    /// Equivalent source dipole inversion of MGS and MAVEN data, predicted
    /// at 150 km altitude.
    Langlais2019,
}

impl MagModel {
    /// Every model.
    pub const ALL: [MagModel; 1] = [MagModel::Langlais2019];

    /// Registry name of the backing dataset.
    pub fn name(self) -> &'static str {
        match self {
            MagModel::Langlais2019 => LANGLAIS_2019,
        }
    }

    /// Reference radius of the coefficients, metres.
    pub fn reference_radius_m(self) -> f64 {
        match self {
            MagModel::Langlais2019 => 3393.5e3,
        }
    }
}

impl FromStr for MagModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        MagModel::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| DataError::unknown("magnetic field model", s, MagModel::ALL.map(MagModel::name)))
    }
}

/// Field components returned by the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagQuantity {
    /// Radial component.
    Radial,
    /// Colatitudinal component.
    Theta,
    /// Longitudinal component.
    Phi,
    /// Total field intensity.
    Total,
    /// Magnetic potential.
    Potential,
}

impl MagQuantity {
    /// Every component.
    pub const ALL: [MagQuantity; 5] = [
        MagQuantity::Radial,
        MagQuantity::Theta,
        MagQuantity::Phi,
        MagQuantity::Total,
        MagQuantity::Potential,
    ];

    /// Grid variable name.
    pub fn name(self) -> &'static str {
        match self {
            MagQuantity::Radial => "radial",
            MagQuantity::Theta => "theta",
            MagQuantity::Phi => "phi",
            MagQuantity::Total => "total",
            MagQuantity::Potential => "potential",
        }
    }
}

impl fmt::Display for MagQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for MagQuantity {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        MagQuantity::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| DataError::unknown("magnetic quantity", s, MagQuantity::ALL.map(MagQuantity::name)))
    }
}

/// A loaded magnetic field grid, in nT.
#[derive(Debug, Clone)]
pub struct MagField {
    model: MagModel,
    lmax: u32,
    grid: GriddedData,
}

impl MagField {
    /// Resolve and expand `model` to degree `lmax`.
    pub fn load(cache: &DatasetCache, expander: Option<&dyn ShExpander>, model: MagModel, lmax: u32) -> Result<Self> {
        let expander = expander.ok_or_else(|| DataError::ExpanderUnavailable(model.name().to_string()))?;
        let path = cache.resolve(model.name())?;
        Self::from_file(expander, model, lmax, &path)
    }

    /// Expand a local coefficient file.
    pub fn from_file(expander: &dyn ShExpander, model: MagModel, lmax: u32, path: &Path) -> Result<Self> {
        let request = ExpandRequest {
            lmax,
            kind: ExpandKind::Magnetic {
                reference_radius_m: model.reference_radius_m(),
            },
        };
        let decoded = expander.expand(path, &request)?;
        check_components(&decoded)?;
        let grid = decoded
            .into_builder()
            .pad_wraparound()?
            .metadata("units", "nT")
            .metadata("lmax", lmax)
            .metadata(
                "links",
                json!({
                    "data": "https://doi.org/10.5281/zenodo.3876714",
                    "paper": "https://doi.org/10.1029/2018JE005854",
                }),
            )
            .metadata("fpath", path.display().to_string())
            .build()?;
        info!("Loaded {} to degree {} ({:?})", model.name(), lmax, grid.shape());
        Ok(Self { model, lmax, grid })
    }

    /// Which model this is.
    pub fn model(&self) -> MagModel {
        self.model
    }

    /// Expansion degree.
    pub fn lmax(&self) -> u32 {
        self.lmax
    }

    /// The padded grid.
    pub fn grid(&self) -> &GriddedData {
        &self.grid
    }

    /// Field component in nT at the nearest grid node.
    pub fn get(&self, lon: f64, lat: f64, quantity: MagQuantity) -> Result<f64> {
        Ok(self.grid.get_value(lon, lat, quantity.name())?)
    }

    /// Nearest-node values shaped `(lat, lon)`.
    pub fn get_values<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A, quantity: MagQuantity) -> Result<Sample<f64>> {
        Ok(self.grid.get_values(lon, lat, quantity.name())?)
    }
}

fn check_components(decoded: &DecodedGrid) -> Result<()> {
    let missing: Vec<&str> = MagQuantity::ALL
        .iter()
        .map(|q| q.name())
        .filter(|name| !decoded.variables.iter().any(|(n, _)| n.as_str() == *name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::Expansion(format!(
            "expander returned no {} component(s)",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redplanet_grid::Array2;

    #[test]
    fn test_quantity_names() {
        assert_eq!("phi".parse::<MagQuantity>().unwrap(), MagQuantity::Phi);
        let err = "bx".parse::<MagQuantity>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown magnetic quantity 'bx'. Options are: radial, theta, phi, total, potential"
        );
    }

    #[test]
    fn test_missing_components_are_reported() {
        let decoded = DecodedGrid {
            lat: vec![0.0],
            lon: vec![0.0],
            variables: vec![("radial".to_string(), Array2::from_fn(1, 1, |_, _| 0.0))],
        };
        let err = check_components(&decoded).unwrap_err().to_string();
        assert!(err.contains("theta, phi, total, potential"), "{}", err);
    }
}
