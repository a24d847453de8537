//! Dataset names and the built-in registry.
//!
//! Only datasets with a published digest ship in [`builtin_registry`]. The
//! rest are referenced by name here and supplied by a deployment registry
//! (YAML) merged over the built-in table:
//!
//! ```no_run
//! use redplanet_cache::StaticRegistry;
//! use redplanet_data::datasets::builtin_registry;
//!
//! let registry = builtin_registry().merge(StaticRegistry::load("datasets.yaml")?);
//! # Ok::<(), redplanet_cache::CacheError>(())
//! ```

use redplanet_cache::{DatasetDescriptor, HashAlgorithm, IndexLayout, StaticRegistry};
use std::path::PathBuf;

/// Mars Odyssey GRS element concentration maps (zip of text tables).
pub const GRS: &str = "GRS";
/// Crustal dichotomy control points.
pub const DICHOTOMY_COORDS: &str = "dichotomy_coords";
/// MOLA 463 m global DEM, raw int16.
pub const DEM_463M: &str = "DEM_463m";
/// MOLA/HRSC blended 200 m global DEM, raw int16.
pub const DEM_200M: &str = "DEM_200m";
/// CSV index of crustal thickness models.
pub const MOHO_REGISTRY: &str = "moho_registry";
/// MOLA planetary shape coefficients (degree 719).
pub const MOLA_SHAPE_719: &str = "MOLA_shape_719";
/// Bouguer anomaly grid, raw f64.
pub const GENOVA_2016: &str = "Genova2016";
/// Crustal magnetic field coefficients.
pub const LANGLAIS_2019: &str = "Langlais2019";

const BOX_SHARED: &str = "https://rutgers.box.com/shared/static/";

/// Registry with every dataset whose digest is known at build time.
pub fn builtin_registry() -> StaticRegistry {
    StaticRegistry::new()
        .with(
            DatasetDescriptor::new(
                GRS,
                format!("{}3u8cokpvnbpl8k7uuka7qtz1atj9pxu5", BOX_SHARED),
                "2022_Mars_Odyssey_GRS_Element_Concentration_Maps.zip",
                "GRS",
            )
            .with_hash(HashAlgorithm::Xxh3_64, "a87a1b3db0e0a3a9")
            .with_hash(
                HashAlgorithm::Sha256,
                "ba2b5cc62b18302b1da0c111101d0d2318e69421877c4f9c145116b41502777b",
            ),
        )
        .with(
            DatasetDescriptor::new(
                DICHOTOMY_COORDS,
                format!("{}tekd1w26h9mvfnyw8bpy4ko4v48931ri", BOX_SHARED),
                "dichotomy_coordinates-JAH-0-360.txt",
                "Crust/dichotomy",
            )
            .with_hash(
                HashAlgorithm::Sha256,
                "42f2b9f32c9e9100ef4a9977171a54654c3bf25602555945405a93ca45ac6bb2",
            ),
        )
}

/// How rows of the `moho_registry` index become crustal model descriptors.
pub fn moho_layout() -> IndexLayout {
    IndexLayout {
        index_dataset: MOHO_REGISTRY.to_string(),
        key_column: "model_name".to_string(),
        code_column: "box_download_code".to_string(),
        url_template: format!("{}{{code}}", BOX_SHARED),
        name_template: "Moho-Mars-{key}".to_string(),
        filename_template: "Moho-Mars-{key}.sh".to_string(),
        cache_subpath: PathBuf::from("Crust/moho/shcoeffs"),
    }
}
