//! Query every available dataset at one point.
//!
//! Usage:
//!   cargo run -p redplanet-data --example query_point -- <lon> <lat> [registry.yaml]
//!
//! The optional YAML registry adds datasets that are not built in (DEMs,
//! Bouguer anomaly, ...). Verbosity is set with `RUST_LOG`, e.g.
//! `RUST_LOG=redplanet_cache=debug`.

use redplanet_cache::{CacheConfig, Registry, StaticRegistry};
use redplanet_data::datasets::{DEM_463M, GENOVA_2016};
use redplanet_data::{BouguerModel, DataError, Element, GrsQuantity, Session, TopoModel};
use std::env;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (lon, lat) = match (args.first().map(|s| s.parse::<f64>()), args.get(1).map(|s| s.parse::<f64>())) {
        (Some(Ok(lon)), Some(Ok(lat))) => (lon, lat),
        _ => {
            eprintln!("usage: query_point <lon> <lat> [registry.yaml]");
            return ExitCode::FAILURE;
        }
    };

    match run(lon, lat, args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(lon: f64, lat: f64, registry_path: Option<&str>) -> Result<(), DataError> {
    let extra = match registry_path {
        Some(path) => StaticRegistry::load(path)?,
        None => StaticRegistry::new(),
    };
    let session = Session::with_config(CacheConfig::default(), extra)?;
    println!("Cache root: {}", session.cache().root().display());
    println!("Point: lon {}, lat {}", lon, lat);

    let dichotomy = session.dichotomy()?;
    println!("  north of dichotomy: {}", dichotomy.is_above(lon, lat)?);

    let grs = session.grs()?;
    for element in Element::ALL {
        match grs.get(element, lon, lat, GrsQuantity::Concentration, false) {
            Ok(v) => println!("  {:>4}: {:.5}", element, v),
            Err(e) => warn!("{}: {}", element, e),
        }
    }

    let registry = session.cache().registry();
    if registry.get(DEM_463M).is_some() {
        let topo = session.topography(TopoModel::Dem463m)?;
        println!("  elevation: {:.1} m", topo.get_interpolated(lon, lat)?);
    }
    if registry.get(GENOVA_2016).is_some() {
        let boug = session.bouguer(BouguerModel::Genova2016)?;
        println!("  Bouguer anomaly: {:.2} mGal", boug.get(lon, lat)?);
    }
    Ok(())
}
