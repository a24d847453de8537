//! Crustal thickness models: Moho depth, crustal thickness and density.
//!
//! Each model is one spherical-harmonic coefficient file selected by four
//! parameters. Files are looked up through the `moho_registry` index, so the
//! registry only needs to know about the index itself.

use crate::datasets::{moho_layout, MOLA_SHAPE_719};
use crate::decode::{ExpandKind, ExpandRequest, ShExpander};
use crate::dichotomy::Dichotomy;
use crate::{DataError, Result};
use redplanet_cache::DatasetCache;
use redplanet_grid::{Coordinates, GridBuilder, GriddedData, LonConvention, Sample};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Degree at which both the Moho and the reference shape are expanded.
pub const MOHO_LMAX: u32 = 90;

macro_rules! interior_models {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Reference interior structure used to invert for the Moho.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum InteriorModel {
            $(
                #[doc = $name]
                $variant,
            )+
        }

        impl InteriorModel {
            /// Every interior model.
            pub const ALL: &'static [InteriorModel] = &[$(InteriorModel::$variant),+];

            /// Name as used in model keys.
            pub fn name(self) -> &'static str {
                match self {
                    $(InteriorModel::$variant => $name,)+
                }
            }
        }
    };
}

interior_models! {
    Dwak => "DWAK",
    DwThot => "DWThot",
    DwThotCrust1 => "DWThotCrust1",
    DwThotCrust1r => "DWThotCrust1r",
    Eh45Tcold => "EH45Tcold",
    Eh45TcoldCrust1 => "EH45TcoldCrust1",
    Eh45TcoldCrust1r => "EH45TcoldCrust1r",
    Eh45ThotCrust2 => "EH45ThotCrust2",
    Eh45ThotCrust2r => "EH45ThotCrust2r",
    Khan2022 => "Khan2022",
    Lfak => "LFAK",
    Sanak => "SANAK",
    Tayak => "TAYAK",
    YotHotRc1760kmDc40km => "YOTHotRc1760kmDc40km",
    YotHotRc1810kmDc40km => "YOTHotRc1810kmDc40km",
    ZgDw => "ZG_DW",
}

impl fmt::Display for InteriorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for InteriorModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        InteriorModel::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| DataError::unknown("interior model", s, InteriorModel::ALL.iter().map(|m| m.name())))
    }
}

/// Parameters selecting one crustal thickness model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MohoParams {
    /// Interior structure model.
    pub interior: InteriorModel,
    /// Crustal thickness at the InSight landing site, km.
    pub insight_thickness: u32,
    /// Crustal density south of the dichotomy, kg/m^3.
    pub rho_south: u32,
    /// Crustal density north of the dichotomy, kg/m^3.
    pub rho_north: u32,
}

impl MohoParams {
    /// Bundle the four parameters.
    pub fn new(interior: InteriorModel, insight_thickness: u32, rho_south: u32, rho_north: u32) -> Self {
        Self {
            interior,
            insight_thickness,
            rho_south,
            rho_north,
        }
    }

    /// Index key, e.g. `Khan2022-39-2900-2900`.
    pub fn key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.interior, self.insight_thickness, self.rho_south, self.rho_north
        )
    }

    /// Dataset name, e.g. `Moho-Mars-Khan2022-39-2900-2900`.
    pub fn dataset_name(&self) -> String {
        moho_layout().dataset_name(&self.key())
    }
}

impl fmt::Display for MohoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Quantities available from a crustal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrustQuantity {
    /// Radius of the crust-mantle boundary, metres.
    Moho,
    /// Shape radius minus Moho radius, metres.
    CrustalThickness,
}

impl CrustQuantity {
    /// Every quantity.
    pub const ALL: [CrustQuantity; 2] = [CrustQuantity::Moho, CrustQuantity::CrustalThickness];

    /// Grid variable name.
    pub fn name(self) -> &'static str {
        match self {
            CrustQuantity::Moho => "moho",
            CrustQuantity::CrustalThickness => "crthick",
        }
    }
}

impl FromStr for CrustQuantity {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        CrustQuantity::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| DataError::unknown("crustal quantity", s, CrustQuantity::ALL.map(CrustQuantity::name)))
    }
}

/// A loaded crustal thickness model.
#[derive(Debug, Clone)]
pub struct Moho {
    params: MohoParams,
    grid: GriddedData,
}

impl Moho {
    /// Resolve, expand and grid the model selected by `params`.
    ///
    /// Fails with [`CacheError::IndexEntryNotFound`](redplanet_cache::CacheError::IndexEntryNotFound)
    /// when no model with these parameters exists.
    pub fn load(cache: &DatasetCache, expander: Option<&dyn ShExpander>, params: MohoParams) -> Result<Self> {
        let expander = expander.ok_or_else(|| DataError::ExpanderUnavailable(params.dataset_name()))?;
        let moho_path = cache.resolve_indexed(&moho_layout(), &params.key())?;
        let shape_path = cache.resolve(MOLA_SHAPE_719)?;
        Self::from_files(expander, params, &moho_path, &shape_path)
    }

    /// Like [`load`](Self::load), but returns `Ok(None)` when the index has
    /// no model with these parameters.
    pub fn try_load(cache: &DatasetCache, expander: Option<&dyn ShExpander>, params: MohoParams) -> Result<Option<Self>> {
        if !cache.index(&moho_layout())?.contains(&params.key()) {
            debug!("No crustal model {} in the index", params);
            return Ok(None);
        }
        Self::load(cache, expander, params).map(Some)
    }

    /// Expand local coefficient files.
    pub fn from_files(expander: &dyn ShExpander, params: MohoParams, moho_path: &Path, shape_path: &Path) -> Result<Self> {
        let request = ExpandRequest {
            lmax: MOHO_LMAX,
            kind: ExpandKind::Shape,
        };
        let mut moho = expander.expand(moho_path, &request)?;
        let mut shape = expander.expand(shape_path, &request)?;
        if !moho.same_axes(&shape) {
            return Err(DataError::Expansion(
                "Moho and shape expansions returned different grids".to_string(),
            ));
        }
        let moho_radius = moho.take_single()?;
        let crthick = shape.take_single()?.zip_with(&moho_radius, |s, m| s - m)?;

        let grid = GridBuilder::new(moho.lon, moho.lat, LonConvention::Positive)
            .variable(CrustQuantity::Moho.name(), moho_radius)
            .variable(CrustQuantity::CrustalThickness.name(), crthick)
            .flip_latitude()
            .pad_wraparound()?
            .metadata("title", params.key())
            .metadata("units", "m")
            .metadata(
                "model_params",
                json!({
                    "interior_model": params.interior.name(),
                    "insight_thickness_km": params.insight_thickness,
                    "rho_south": params.rho_south,
                    "rho_north": params.rho_north,
                }),
            )
            .metadata("lmax", MOHO_LMAX)
            .metadata("source", "https://doi.org/10.5281/zenodo.6477509")
            .metadata("fpath", moho_path.display().to_string())
            .build()?;
        info!("Loaded crustal model {} ({:?})", params, grid.shape());
        Ok(Self { params, grid })
    }

    /// Model parameters.
    pub fn params(&self) -> MohoParams {
        self.params
    }

    /// The padded grid.
    pub fn grid(&self) -> &GriddedData {
        &self.grid
    }

    /// Nearest-node value in metres.
    pub fn get(&self, lon: f64, lat: f64, quantity: CrustQuantity) -> Result<f64> {
        Ok(self.grid.get_value(lon, lat, quantity.name())?)
    }

    /// Nearest-node values shaped `(lat, lon)`.
    pub fn get_values<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A, quantity: CrustQuantity) -> Result<Sample<f64>> {
        Ok(self.grid.get_values(lon, lat, quantity.name())?)
    }

    /// Bilinearly interpolated value in metres.
    pub fn get_interpolated(&self, lon: f64, lat: f64, quantity: CrustQuantity) -> Result<f64> {
        Ok(self.grid.interpolate_value(lon, lat, quantity.name())?)
    }

    /// Bilinearly interpolated values shaped `(lat, lon)`.
    pub fn interpolate<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A, quantity: CrustQuantity) -> Result<Sample<f64>> {
        Ok(self.grid.interpolate(lon, lat, quantity.name())?)
    }

    /// Crustal density in kg/m^3: `rho_north` on or above the dichotomy,
    /// `rho_south` below it.
    pub fn density(&self, lon: f64, lat: f64, dichotomy: &Dichotomy) -> Result<f64> {
        let rho = if dichotomy.is_above(lon, lat)? {
            self.params.rho_north
        } else {
            self.params.rho_south
        };
        Ok(rho as f64)
    }
}
