//! Bouguer gravity anomaly.

use crate::datasets::GENOVA_2016;
use crate::decode::{read_padded_f64, RasterLayout, RowOrder};
use crate::{DataError, Result};
use redplanet_cache::DatasetCache;
use redplanet_grid::{Coordinates, GridBuilder, GriddedData, LonConvention, Sample};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const VARIABLE: &str = "boug";

/// Available Bouguer anomaly models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BouguerModel {
    /// Computed from the truncated GMM-3 solution (degree 2 to 90),
    /// 16 pixels per degree.
    Genova2016,
}

impl BouguerModel {
    /// Every model.
    pub const ALL: [BouguerModel; 1] = [BouguerModel::Genova2016];

    /// Registry name of the backing dataset.
    pub fn name(self) -> &'static str {
        match self {
            BouguerModel::Genova2016 => GENOVA_2016,
        }
    }

    /// Shape and cell-centred axes of the raw file.
    pub fn layout(self) -> RasterLayout {
        match self {
            BouguerModel::Genova2016 => RasterLayout {
                rows: 2880,
                cols: 5760,
                lon_start: 1.0 / 32.0,
                lon_step: 360.0 / 5760.0,
                lat_start: -90.0 + 1.0 / 32.0,
                lat_step: 180.0 / 2880.0,
            },
        }
    }
}

impl FromStr for BouguerModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        BouguerModel::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| DataError::unknown("Bouguer model", s, BouguerModel::ALL.map(BouguerModel::name)))
    }
}

/// A loaded Bouguer anomaly grid, in mGal.
#[derive(Debug, Clone)]
pub struct Bouguer {
    model: BouguerModel,
    grid: GriddedData,
}

impl Bouguer {
    /// Resolve and read `model` through the cache.
    pub fn load(cache: &DatasetCache, model: BouguerModel) -> Result<Self> {
        let path = cache.resolve(model.name())?;
        Self::from_file(model, &path)
    }

    /// Read a raw file with the model's native layout.
    pub fn from_file(model: BouguerModel, path: &Path) -> Result<Self> {
        Self::from_raster(model, path, &model.layout())
    }

    /// Read a raw north-first `float64` file with an explicit layout.
    pub fn from_raster(model: BouguerModel, path: &Path, layout: &RasterLayout) -> Result<Self> {
        let samples = read_padded_f64(path, layout, RowOrder::NorthFirst)?;
        let grid = GridBuilder::new(layout.lon_axis(), layout.lat_axis(), LonConvention::Positive)
            .pad_axes()?
            .variable(VARIABLE, samples)
            .metadata("units", "mGal")
            .metadata("fpath", path.display().to_string())
            .build()?;
        info!("Loaded {} ({}x{})", model.name(), layout.rows, layout.cols);
        Ok(Self { model, grid })
    }

    /// Which model this is.
    pub fn model(&self) -> BouguerModel {
        self.model
    }

    /// The padded grid.
    pub fn grid(&self) -> &GriddedData {
        &self.grid
    }

    /// Anomaly in mGal at the nearest grid node.
    pub fn get(&self, lon: f64, lat: f64) -> Result<f64> {
        Ok(self.grid.get_value(lon, lat, VARIABLE)?)
    }

    /// Nearest-node anomalies shaped `(lat, lon)`.
    pub fn get_values<L: Coordinates, A: Coordinates>(&self, lon: &L, lat: &A) -> Result<Sample<f64>> {
        Ok(self.grid.get_values(lon, lat, VARIABLE)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_native_layout() {
        let layout = BouguerModel::Genova2016.layout();
        let lon = layout.lon_axis();
        let lat = layout.lat_axis();
        assert_eq!(lon[0], 0.03125);
        assert_eq!(lon[5759], 359.96875);
        assert_eq!(lat[0], -89.96875);
        assert_eq!(lat[2879], 89.96875);
    }

    #[test]
    fn test_rows_are_flipped_to_increasing_latitude() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boug.bin");
        // 2 rows x 4 cols, north row first.
        let north = [10.0f64, 11.0, 12.0, 13.0];
        let south = [-10.0f64, -11.0, -12.0, -13.0];
        let bytes: Vec<u8> = north.iter().chain(south.iter()).flat_map(|v| v.to_le_bytes()).collect();
        fs::write(&path, bytes).unwrap();

        let layout = RasterLayout {
            rows: 2,
            cols: 4,
            lon_start: 45.0,
            lon_step: 90.0,
            lat_start: -45.0,
            lat_step: 90.0,
        };
        let boug = Bouguer::from_raster(BouguerModel::Genova2016, &path, &layout).unwrap();
        assert_eq!(boug.grid().lat(), &[-45.0, 45.0, 135.0]);
        assert_eq!(boug.get(45.0, 45.0).unwrap(), 10.0);
        assert_eq!(boug.get(135.0, -45.0).unwrap(), -11.0);
        // Signed input converts to positive: -45 is 315.
        assert_eq!(boug.get(-45.0, 30.0).unwrap(), 13.0);
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(
            "Genova2017".parse::<BouguerModel>(),
            Err(DataError::UnknownModel { .. })
        ));
    }
}
