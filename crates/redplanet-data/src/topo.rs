//! Surface elevation from global MOLA-based DEMs.
//!
//! The DEMs are stored as raw little-endian `int16` metres, row-major, rows
//! south to north, columns in signed longitude. The samples stay `int16` in
//! memory (a 463 m grid is about 2 GB) and are widened to `f64` on lookup.

use crate::datasets::{DEM_200M, DEM_463M};
use crate::decode::{read_padded_i16, RasterLayout, RowOrder};
use crate::{DataError, Result};
use redplanet_cache::DatasetCache;
use redplanet_grid::{Coordinates, GridBuilder, GriddedData, LonConvention, Sample};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const VARIABLE: &str = "topo";

/// Available topography models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopoModel {
    /// Mars MGS MOLA DEM 463m.
    Dem463m,
    /// Mars MGS MOLA - MEX HRSC Blended DEM Global 200m.
    Dem200m,
}

impl TopoModel {
    /// Every model.
    pub const ALL: [TopoModel; 2] = [TopoModel::Dem463m, TopoModel::Dem200m];

    /// Registry name of the backing dataset.
    pub fn name(self) -> &'static str {
        match self {
            TopoModel::Dem463m => DEM_463M,
            TopoModel::Dem200m => DEM_200M,
        }
    }

    /// Shape and axes of the raw file.
    pub fn layout(self) -> RasterLayout {
        match self {
            TopoModel::Dem463m => RasterLayout {
                rows: 23041,
                cols: 46081,
                lon_start: -179.9960938347692,
                lon_step: 0.007812330461578525,
                lat_start: -89.99376946560506,
                lat_step: 0.00781206004494716,
            },
            TopoModel::Dem200m => RasterLayout {
                rows: 53347,
                cols: 106694,
                lon_start: -179.9983129395848,
                lon_step: 0.0033741208306410017,
                lat_start: -89.99753689179012,
                lat_step: 0.0033741208306410004,
            },
        }
    }

    fn title(self) -> &'static str {
        match self {
            TopoModel::Dem463m => "Mars MGS MOLA DEM 463m",
            TopoModel::Dem200m => "Mars MGS MOLA - MEX HRSC Blended DEM Global 200m",
        }
    }

    fn link(self) -> &'static str {
        match self {
            TopoModel::Dem463m => "https://astrogeology.usgs.gov/search/map/mars_mgs_mola_dem_463m",
            TopoModel::Dem200m => {
                "https://astrogeology.usgs.gov/search/map/mars_mgs_mola_mex_hrsc_blended_dem_global_200m"
            }
        }
    }
}

impl fmt::Display for TopoModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for TopoModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        TopoModel::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| DataError::unknown("topography model", s, TopoModel::ALL.map(TopoModel::name)))
    }
}

/// A loaded topography model.
#[derive(Debug, Clone)]
pub struct Topography {
    model: TopoModel,
    grid: GriddedData,
}

impl Topography {
    /// Resolve and read `model` through the cache.
    pub fn load(cache: &DatasetCache, model: TopoModel) -> Result<Self> {
        let path = cache.resolve(model.name())?;
        Self::from_file(model, &path)
    }

    /// Read a raw file with the model's native layout.
    pub fn from_file(model: TopoModel, path: &Path) -> Result<Self> {
        Self::from_raster(model, path, &model.layout())
    }

    /// Read a raw file with an explicit layout (crops, test rasters).
    pub fn from_raster(model: TopoModel, path: &Path, layout: &RasterLayout) -> Result<Self> {
        let samples = read_padded_i16(path, layout, RowOrder::SouthFirst)?;
        let grid = GridBuilder::new(layout.lon_axis(), layout.lat_axis(), LonConvention::Signed)
            .pad_axes()?
            .variable(VARIABLE, samples)
            .metadata("title", model.title())
            .metadata("units", "m")
            .metadata("link", model.link())
            .metadata("fpath", path.display().to_string())
            .build()?;
        info!("Loaded {} ({}x{}) from {}", model, layout.rows, layout.cols, path.display());
        Ok(Self { model, grid })
    }

    /// Which model this is.
    pub fn model(&self) -> TopoModel {
        self.model
    }

    /// The padded grid.
    pub fn grid(&self) -> &GriddedData {
        &self.grid
    }

    /// Elevation in metres at the nearest grid node.
    pub fn get(&self, lon: f64, lat: f64) -> Result<f64> {
        Ok(self.grid.get_value(lon, lat, VARIABLE)?)
    }

    /// Nearest-node elevations shaped `(lat, lon)`.
    pub fn get_values<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A) -> Result<Sample<f64>> {
        Ok(self.grid.get_values(lon, lat, VARIABLE)?)
    }

    /// Bilinearly interpolated elevation in metres.
    pub fn get_interpolated(&self, lon: f64, lat: f64) -> Result<f64> {
        Ok(self.grid.interpolate_value(lon, lat, VARIABLE)?)
    }

    /// Bilinearly interpolated elevations shaped `(lat, lon)`.
    pub fn interpolate<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A) -> Result<Sample<f64>> {
        Ok(self.grid.interpolate(lon, lat, VARIABLE)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use redplanet_grid::{concentric_ring_coords, radial_profile, RingSpacing, Samples};
    use std::fs;

    #[test]
    fn test_model_names() {
        assert_eq!("DEM_463m".parse::<TopoModel>().unwrap(), TopoModel::Dem463m);
        let err = "DEM_1m".parse::<TopoModel>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown topography model 'DEM_1m'. Options are: DEM_463m, DEM_200m");
    }

    #[test]
    fn test_native_axes_cover_the_globe() {
        for model in TopoModel::ALL {
            let layout = model.layout();
            let lon = layout.lon_axis();
            let lat = layout.lat_axis();
            assert_eq!(lon.len(), layout.cols);
            assert!(lon[0] > -180.0 && lon[lon.len() - 1] < 180.0, "{}", model);
            assert!(lat[0] > -90.0 && lat[lat.len() - 1] < 90.0, "{}", model);
        }
    }

    fn coarse_layout() -> RasterLayout {
        // 4 x 8 global raster, 45 degree spacing, cell centred.
        RasterLayout {
            rows: 4,
            cols: 8,
            lon_start: -157.5,
            lon_step: 45.0,
            lat_start: -67.5,
            lat_step: 45.0,
        }
    }

    #[test]
    fn test_from_raster_keeps_int16_and_pads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.bin");
        let bytes: Vec<u8> = (0..32i16).flat_map(|v| (v * 100 - 1000).to_le_bytes()).collect();
        fs::write(&path, bytes).unwrap();

        let topo = Topography::from_raster(TopoModel::Dem463m, &path, &coarse_layout()).unwrap();
        assert_eq!(topo.grid().shape(), (5, 10));
        assert!(matches!(topo.grid().variable("topo").unwrap().samples(), Samples::I16(_)));

        // Row 1 (lat -22.5), column 2 (lon -67.5): sample 10.
        assert_eq!(topo.get(-67.5, -22.5).unwrap(), 0.0);
        // Between columns 2 and 3 on row 1.
        assert_abs_diff_eq!(topo.get_interpolated(-45.0, -22.5).unwrap(), 50.0, epsilon = 1e-9);
        // Between the last column (157.5) and the wrapped column 0 (202.5).
        assert_abs_diff_eq!(topo.get_interpolated(180.0, -67.5).unwrap(), -650.0, epsilon = 1e-9);
        assert_abs_diff_eq!(topo.get_interpolated(-180.0, -67.5).unwrap(), -650.0, epsilon = 1e-9);
        // 200 (positive) is -160 (signed): column 0.
        assert_eq!(topo.get(200.0, -67.5).unwrap(), -1000.0);
        assert_eq!(topo.get(170.0, -67.5).unwrap(), -300.0);
    }

    #[test]
    fn test_radial_profile_over_topography() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.bin");
        let bytes: Vec<u8> = (0..32i16).flat_map(|v| (v * 100 - 1000).to_le_bytes()).collect();
        fs::write(&path, bytes).unwrap();
        let topo = Topography::from_raster(TopoModel::Dem463m, &path, &coarse_layout()).unwrap();

        // Rings far smaller than the 45 degree cells all snap to one node.
        let rings = concentric_ring_coords(-67.5, -22.5, 100.0, RingSpacing::Count(2), 50.0).unwrap();
        let profile = radial_profile(&rings, |lon, lat| topo.get(lon, lat)).unwrap();
        assert_eq!(profile.mean, vec![0.0, 0.0]);
        assert_eq!(profile.std, vec![0.0, 0.0]);
        assert_eq!(profile.values[1].len(), 13);
    }
}
