//! Surface element concentrations from the Mars Odyssey Gamma Ray
//! Spectrometer.
//!
//! The dataset is a zip archive with one whitespace-separated table per
//! element (`lat lon concentration sigma`, one header line) on a 5 degree
//! grid. Concentrations are converted to mass fractions on load: thorium is
//! stored in ppm, everything else in weight percent.

use crate::datasets::GRS;
use crate::{DataError, Result};
use redplanet_cache::DatasetCache;
use redplanet_grid::{Array2, Coordinates, GridBuilder, GriddedData, LonConvention, Sample};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use zip::ZipArchive;

/// Missing-value marker in the source tables.
pub const MISSING_VALUE: f64 = 9999.999;

/// Name of the derived volatile sum (`cl + h2o + s`).
pub const VOLATILES: &str = "cl+h2o+s";

/// Elements mapped by the spectrometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// Aluminium.
    Al,
    /// Calcium.
    Ca,
    /// Chlorine.
    Cl,
    /// Iron.
    Fe,
    /// Water.
    H2o,
    /// Potassium.
    K,
    /// Silicon.
    Si,
    /// Sulfur.
    S,
    /// Thorium.
    Th,
}

impl Element {
    /// Every element.
    pub const ALL: [Element; 9] = [
        Element::Al,
        Element::Ca,
        Element::Cl,
        Element::Fe,
        Element::H2o,
        Element::K,
        Element::Si,
        Element::S,
        Element::Th,
    ];

    /// Lowercase name, as used in file and variable names.
    pub fn name(self) -> &'static str {
        match self {
            Element::Al => "al",
            Element::Ca => "ca",
            Element::Cl => "cl",
            Element::Fe => "fe",
            Element::H2o => "h2o",
            Element::K => "k",
            Element::Si => "si",
            Element::S => "s",
            Element::Th => "th",
        }
    }

    /// Chlorine, water and sulfur.
    pub fn is_volatile(self) -> bool {
        matches!(self, Element::Cl | Element::H2o | Element::S)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Element {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Element::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| DataError::unknown("element", s, Element::ALL.map(Element::name)))
    }
}

/// Per-element quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrsQuantity {
    /// Mass fraction.
    Concentration,
    /// One-sigma uncertainty of the mass fraction.
    Sigma,
}

impl GrsQuantity {
    /// Every quantity.
    pub const ALL: [GrsQuantity; 2] = [GrsQuantity::Concentration, GrsQuantity::Sigma];

    /// Suffix used in variable names.
    pub fn name(self) -> &'static str {
        match self {
            GrsQuantity::Concentration => "concentration",
            GrsQuantity::Sigma => "sigma",
        }
    }
}

impl FromStr for GrsQuantity {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        GrsQuantity::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| DataError::unknown("GRS quantity", s, GrsQuantity::ALL.map(GrsQuantity::name)))
    }
}

fn variable_name(element: &str, quantity: GrsQuantity) -> String {
    format!("{}_{}", element, quantity.name())
}

fn scale_factor(element: &str) -> f64 {
    if element == Element::Th.name() {
        1e-6
    } else {
        0.01
    }
}

/// One parsed element table: `[lat, lon, concentration, sigma]` rows.
type Table = Vec<[f64; 4]>;

/// Loaded GRS concentration maps.
#[derive(Debug, Clone)]
pub struct Grs {
    grid: GriddedData,
}

impl Grs {
    /// Resolve and read the `GRS` archive through the cache.
    pub fn load(cache: &DatasetCache) -> Result<Self> {
        let path = cache.resolve(GRS)?;
        Self::from_archive(&path)
    }

    /// Read a local archive.
    pub fn from_archive(path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
        let mut tables: BTreeMap<String, Table> = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_string();
            let file_name = entry_name.rsplit('/').next().unwrap_or(&entry_name);
            if file_name.starts_with("README") {
                continue;
            }
            let element = file_name.split('_').next().unwrap_or(file_name).to_lowercase();
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let table = parse_table(&entry_name, &text)?;
            debug!("GRS table {} -> '{}' ({} rows)", entry_name, element, table.len());
            tables.insert(element, table);
        }

        let grid = build_grid(&tables)?
            .metadata(
                "description",
                "2001 Mars Odyssey Gamma Ray Spectrometer Element Concentration Maps",
            )
            .metadata("units", "concentration out of 1")
            .metadata("elements", json!(tables.keys().collect::<Vec<_>>()))
            .metadata("grid_spacing", 5)
            .metadata("fpath", path.display().to_string())
            .build()?;
        info!("Loaded GRS maps for {} elements ({:?})", tables.len(), grid.shape());
        Ok(Self { grid })
    }

    /// The grid (signed longitude, not padded).
    pub fn grid(&self) -> &GriddedData {
        &self.grid
    }

    /// Value of `quantity` for `element` at the nearest grid node.
    ///
    /// With `normalize`, the value is rescaled to a volatile-free basis by
    /// dividing by `1 - (cl + h2o + s)`; volatile elements cannot be
    /// normalized.
    pub fn get(&self, element: Element, lon: f64, lat: f64, quantity: GrsQuantity, normalize: bool) -> Result<f64> {
        self.get_values(element, &lon, &lat, quantity, normalize)
            .map(|s| s.get(0, 0))
    }

    /// [`get`](Self::get) for every (lat, lon) pair.
    pub fn get_values<L: Coordinates, A: Coordinates>(
        &self,
        element: Element,
        lon: &L,
        lat: &A,
        quantity: GrsQuantity,
        normalize: bool,
    ) -> Result<Sample<f64>> {
        if normalize && element.is_volatile() {
            return Err(DataError::NormalizeVolatile(element.name().to_string()));
        }
        let values = self
            .grid
            .get_values(lon, lat, &variable_name(element.name(), quantity))?;
        if !normalize {
            return Ok(values);
        }
        let volatiles = self.grid.get_values(lon, lat, &variable_name(VOLATILES, quantity))?;
        Ok(values.zip_with(&volatiles, |v, vol| v / (1.0 - vol))?)
    }
}

fn parse_table(file: &str, text: &str) -> Result<Table> {
    let mut rows = Vec::new();
    // First line is a header.
    for (i, line) in text.lines().enumerate().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 4 {
            return Err(DataError::Parse {
                file: file.to_string(),
                line: i + 1,
                reason: format!("expected 4 columns, found {}", fields.len()),
            });
        }
        let mut row = [0.0; 4];
        for (slot, field) in row.iter_mut().zip(&fields) {
            let value: f64 = field.parse().map_err(|_| DataError::Parse {
                file: file.to_string(),
                line: i + 1,
                reason: format!("'{}' is not a number", field),
            })?;
            *slot = if value == MISSING_VALUE { f64::NAN } else { value };
        }
        rows.push(row);
    }
    Ok(rows)
}

fn sorted_axis(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut axis: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    axis.sort_by(f64::total_cmp);
    axis.dedup();
    axis
}

fn position(axis: &[f64], v: f64) -> Option<usize> {
    axis.binary_search_by(|a| a.total_cmp(&v)).ok()
}

/// Outer-join every table onto a shared lat/lon grid; gaps become NaN.
fn build_grid(tables: &BTreeMap<String, Table>) -> Result<GridBuilder> {
    let lat = sorted_axis(tables.values().flatten().map(|r| r[0]));
    let lon = sorted_axis(tables.values().flatten().map(|r| r[1]));
    let (rows, cols) = (lat.len(), lon.len());

    let mut builder = GridBuilder::new(lon.clone(), lat.clone(), LonConvention::Signed);
    let mut volatiles = [vec![0.0; rows * cols], vec![0.0; rows * cols]];

    for (element, table) in tables {
        let scale = scale_factor(element);
        let mut maps = [vec![f64::NAN; rows * cols], vec![f64::NAN; rows * cols]];
        for row in table {
            if let (Some(r), Some(c)) = (position(&lat, row[0]), position(&lon, row[1])) {
                maps[0][r * cols + c] = row[2] * scale;
                maps[1][r * cols + c] = row[3] * scale;
            }
        }
        let volatile = element.parse::<Element>().map(Element::is_volatile).unwrap_or(false);
        for (q, values) in maps.into_iter().enumerate() {
            if volatile {
                for (sum, v) in volatiles[q].iter_mut().zip(&values) {
                    if !v.is_nan() {
                        *sum += v;
                    }
                }
            }
            builder = builder.variable(
                variable_name(element, GrsQuantity::ALL[q]),
                Array2::from_f64(rows, cols, values)?,
            );
        }
    }

    for (q, values) in volatiles.into_iter().enumerate() {
        builder = builder.variable(
            variable_name(VOLATILES, GrsQuantity::ALL[q]),
            Array2::from_f64(rows, cols, values)?,
        );
    }
    Ok(builder)
}
