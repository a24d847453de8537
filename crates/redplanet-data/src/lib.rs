//! # redplanet-data
//!
//! Point queries against global Mars datasets.
//!
//! Every dataset is resolved through a verified
//! [`DatasetCache`](redplanet_cache::DatasetCache), read once into a
//! [`GriddedData`](redplanet_grid::GriddedData) and then queried by
//! longitude and latitude in either convention.
//!
//! ## Datasets
//!
//! | Accessor | Dataset | Lookup | Units |
//! |----------|---------|--------|-------|
//! | [`Dichotomy`] | `dichotomy_coords` | threshold curve | - |
//! | [`Topography`] | `DEM_463m`, `DEM_200m` | nearest, bilinear | m |
//! | [`Moho`] | `Moho-Mars-*` via `moho_registry`, `MOLA_shape_719` | nearest, bilinear | m, kg/m^3 |
//! | [`Bouguer`] | `Genova2016` | nearest | mGal |
//! | [`MagField`] | `Langlais2019` | nearest | nT |
//! | [`Grs`] | `GRS` | nearest | mass fraction |
//!
//! Only `GRS` and `dichotomy_coords` ship in [`datasets::builtin_registry`];
//! the others are supplied through a YAML registry merged on top.
//!
//! Crustal and magnetic models are stored as spherical-harmonic
//! coefficients. Expanding them is delegated to a [`ShExpander`]
//! implementation supplied by the caller; without one those loads fail with
//! [`DataError::ExpanderUnavailable`].
//!
//! ## Example
//!
//! ```no_run
//! use redplanet_cache::{CacheConfig, StaticRegistry};
//! use redplanet_data::{Element, GrsQuantity, Session};
//!
//! let session = Session::with_config(CacheConfig::default(), StaticRegistry::new())?;
//!
//! let grs = session.grs()?;
//! let fe = grs.get(Element::Fe, 137.4, -4.6, GrsQuantity::Concentration, true)?;
//! println!("Iron at Gale crater (volatile-free): {:.3}", fe);
//!
//! let north = session.dichotomy()?.is_above(137.4, -4.6)?;
//! println!("North of the dichotomy: {}", north);
//! # Ok::<(), redplanet_data::DataError>(())
//! ```

mod bouguer;
pub mod datasets;
mod decode;
mod dichotomy;
mod error;
mod grs;
mod mag;
mod moho;
mod session;
mod slots;
mod topo;

pub use bouguer::{Bouguer, BouguerModel};
pub use decode::{
    read_padded_f64, read_padded_i16, read_raw_f64, read_raw_i16, DecodedGrid, ExpandKind, ExpandRequest, RasterLayout,
    RowOrder, ShExpander,
};
pub use dichotomy::Dichotomy;
pub use error::DataError;
pub use grs::{Element, Grs, GrsQuantity, MISSING_VALUE, VOLATILES};
pub use mag::{MagField, MagModel, MagQuantity, DEFAULT_MAG_LMAX};
pub use moho::{CrustQuantity, InteriorModel, Moho, MohoParams, MOHO_LMAX};
pub use session::Session;
pub use slots::ModelSlots;
pub use topo::{TopoModel, Topography};

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;
