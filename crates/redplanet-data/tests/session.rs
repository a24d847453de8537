//! Accessors driven end to end through a `Session`, with an in-memory
//! transport and a stand-in spherical-harmonic expander.

use approx::assert_abs_diff_eq;
use redplanet_cache::hash::digest_bytes;
use redplanet_cache::{
    CacheConfig, CacheError, DatasetCache, DatasetDescriptor, Fetcher, HashAlgorithm, RetryPolicy, StaticRegistry,
    Transport,
};
use redplanet_data::datasets::builtin_registry;
use redplanet_data::{
    CrustQuantity, DataError, DecodedGrid, Element, ExpandKind, ExpandRequest, GrsQuantity, InteriorModel,
    MagModel, MagQuantity, MohoParams, Session, ShExpander, TopoModel, DEFAULT_MAG_LMAX, MOHO_LMAX,
};
use redplanet_grid::Array2;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct MemoryTransport {
    bodies: HashMap<String, Vec<u8>>,
    opens: Mutex<HashMap<String, usize>>,
}

impl MemoryTransport {
    fn opens(&self, url: &str) -> usize {
        self.opens.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &str) -> redplanet_cache::Result<Box<dyn Read + Send>> {
        *self.opens.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        match self.bodies.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(CacheError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Expands a file holding a single number `base` into a 3 x 4 grid
/// (lat 60, 0, -60; lon 0, 90, 180, 270) with values `base + 10 * row + col`.
#[derive(Default)]
struct FakeExpander {
    requests: Mutex<Vec<ExpandRequest>>,
}

impl ShExpander for FakeExpander {
    fn expand(&self, path: &Path, request: &ExpandRequest) -> redplanet_data::Result<DecodedGrid> {
        self.requests.lock().unwrap().push(*request);
        let base: f64 = fs::read_to_string(path)?
            .trim()
            .parse()
            .map_err(|_| DataError::Expansion("unreadable coefficients".to_string()))?;
        let field = |offset: f64| Array2::from_fn(3, 4, move |r, c| base + offset + (10 * r + c) as f64);
        let variables = match request.kind {
            ExpandKind::Shape => vec![("shape".to_string(), field(0.0))],
            ExpandKind::Magnetic { .. } => ["radial", "theta", "phi", "total", "potential"]
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), field(1000.0 * i as f64)))
                .collect(),
        };
        Ok(DecodedGrid {
            lat: vec![60.0, 0.0, -60.0],
            lon: vec![0.0, 90.0, 180.0, 270.0],
            variables,
        })
    }
}

const MOHO_URL: &str = "https://rutgers.box.com/shared/static/khan39";

struct Fixture {
    _dir: tempfile::TempDir,
    transport: Arc<MemoryTransport>,
    expander: Arc<FakeExpander>,
    session: Session,
}

fn sha256(bytes: &[u8]) -> String {
    digest_bytes(bytes, HashAlgorithm::Sha256)
}

fn grs_archive() -> Vec<u8> {
    let table = |v: f64| {
        let mut text = "lat lon concentration sigma\n".to_string();
        for lat in [-2.5, 2.5] {
            for lon in [-2.5, 2.5] {
                text.push_str(&format!("{} {} {} {}\n", lat, lon, v, v / 10.0));
            }
        }
        text
    };
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in [
        ("README.md", "readme".to_string()),
        ("Si_5deg.txt", table(20.0)),
        ("H2O_5deg.txt", table(20.0)),
    ] {
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn fixture() -> Fixture {
    let moho_coeffs = b"3350000".to_vec();
    let index = format!(
        "model_name,box_download_code,sha256\nKhan2022-39-2900-2800,khan39,{}\n",
        sha256(&moho_coeffs)
    );
    let files: Vec<(&str, &str, &str, &str, Vec<u8>)> = vec![
        ("dichotomy_coords", "mem://dichotomy", "dichotomy.txt", "Crust/dichotomy", b"0 0\n180 0\n".to_vec()),
        ("moho_registry", "mem://moho_registry", "moho_registry.csv", "Crust/moho", index.into_bytes()),
        ("MOLA_shape_719", "mem://shape", "MOLA_shape_719.bshc", "Crust/moho", b"3390000".to_vec()),
        ("Langlais2019", "mem://mag", "Langlais2019.sh", "Mag/sh", b"0".to_vec()),
        ("DEM_463m", "mem://dem", "dem.bin", "Crust/topo", vec![0u8; 64]),
        ("GRS", "mem://grs", "grs.zip", "GRS", grs_archive()),
    ];

    let mut transport = MemoryTransport::default();
    transport.bodies.insert(MOHO_URL.to_string(), moho_coeffs);
    let mut extra = StaticRegistry::new();
    for (name, url, filename, subpath, body) in files {
        extra.insert(
            DatasetDescriptor::new(name, url, filename, subpath).with_hash(HashAlgorithm::Sha256, sha256(&body)),
        );
        transport.bodies.insert(url.to_string(), body);
    }
    let transport = Arc::new(transport);

    let dir = tempfile::tempdir().unwrap();
    let fetcher = Fetcher::new(
        transport.clone(),
        RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
        },
    );
    let registry = builtin_registry().merge(extra);
    let cache = DatasetCache::with_fetcher(
        CacheConfig::default().with_cache_root(dir.path()),
        Arc::new(registry),
        fetcher,
    );
    let expander = Arc::new(FakeExpander::default());
    let session = Session::new(cache).with_expander(expander.clone());
    Fixture {
        _dir: dir,
        transport,
        expander,
        session,
    }
}

fn khan() -> MohoParams {
    MohoParams::new(InteriorModel::Khan2022, 39, 2900, 2800)
}

#[test]
fn test_moho_two_hop_load_and_queries() {
    let f = fixture();
    let moho = f.session.moho(khan()).unwrap();

    // Southernmost row after the flip is decoded row 2.
    assert_eq!(moho.get(90.0, -60.0, CrustQuantity::Moho).unwrap(), 3350021.0);
    // Signed input: -90 is column 3.
    assert_eq!(moho.get(-90.0, -60.0, CrustQuantity::Moho).unwrap(), 3350023.0);
    assert_abs_diff_eq!(
        moho.get_interpolated(45.0, -60.0, CrustQuantity::Moho).unwrap(),
        3350020.5,
        epsilon = 1e-6
    );
    assert_eq!(moho.get(10.0, 20.0, CrustQuantity::CrustalThickness).unwrap(), 40000.0);

    let requests = f.expander.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.lmax == MOHO_LMAX && r.kind == ExpandKind::Shape));
    assert_eq!(moho.grid().metadata()["title"], "Khan2022-39-2900-2800");
}

#[test]
fn test_moho_is_loaded_once() {
    let f = fixture();
    let handles: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..4).map(|_| s.spawn(|| f.session.moho(khan()).unwrap())).collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(f.expander.requests.lock().unwrap().len(), 2);
    assert_eq!(f.transport.opens(MOHO_URL), 1);
}

#[test]
fn test_missing_moho_model() {
    let f = fixture();
    let absent = MohoParams::new(InteriorModel::Dwak, 10, 2500, 2500);
    assert!(f.session.try_moho(absent).unwrap().is_none());
    assert!(f.session.try_moho(khan()).unwrap().is_some());
    match f.session.moho(absent) {
        Err(DataError::Cache(CacheError::IndexEntryNotFound { index, key })) => {
            assert_eq!(index, "moho_registry");
            assert_eq!(key, "DWAK-10-2500-2500");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_crustal_density_follows_dichotomy() {
    let f = fixture();
    assert_eq!(f.session.crustal_density(khan(), 30.0, 10.0).unwrap(), 2800.0);
    assert_eq!(f.session.crustal_density(khan(), 30.0, 0.0).unwrap(), 2800.0);
    assert_eq!(f.session.crustal_density(khan(), 30.0, -10.0).unwrap(), 2900.0);
    assert!(matches!(
        f.session.crustal_density(khan(), 30.0, 95.0),
        Err(DataError::Grid(_))
    ));
}

#[test]
fn test_spherical_harmonic_loads_need_an_expander() {
    let f = fixture();
    let bare = Session::new(DatasetCache::with_fetcher(
        f.session.cache().config().clone(),
        Arc::new(builtin_registry()),
        Fetcher::new(f.transport.clone(), RetryPolicy::default()),
    ));
    assert!(matches!(bare.moho(khan()), Err(DataError::ExpanderUnavailable(_))));
    assert!(matches!(
        bare.mag(MagModel::Langlais2019, DEFAULT_MAG_LMAX),
        Err(DataError::ExpanderUnavailable(_))
    ));
}

#[test]
fn test_magnetic_field() {
    let f = fixture();
    let mag = f.session.mag(MagModel::Langlais2019, DEFAULT_MAG_LMAX).unwrap();
    // Northernmost row after the flip is decoded row 0; total is offset 3000.
    assert_eq!(mag.get(180.0, 60.0, MagQuantity::Total).unwrap(), 3002.0);
    assert_eq!(mag.get(180.0, 60.0, MagQuantity::Radial).unwrap(), 2.0);
    assert_eq!(mag.lmax(), 134);

    let requests = f.expander.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![ExpandRequest {
            lmax: 134,
            kind: ExpandKind::Magnetic {
                reference_radius_m: 3393.5e3
            },
        }]
    );
}

#[test]
fn test_truncated_dem_is_rejected() {
    let f = fixture();
    match f.session.topography(TopoModel::Dem463m) {
        Err(DataError::RasterSize { expected, actual, .. }) => {
            assert_eq!(expected, 23041 * 46081 * 2);
            assert_eq!(actual, 64);
        }
        other => panic!("unexpected {:?}", other),
    }
    // Not registered at all.
    assert!(matches!(
        f.session.topography(TopoModel::Dem200m),
        Err(DataError::Cache(CacheError::DatasetNotFound { .. }))
    ));
}

#[test]
fn test_grs_through_session() {
    let f = fixture();
    let grs = f.session.grs().unwrap();
    assert_abs_diff_eq!(
        grs.get(Element::Si, 2.5, 2.5, GrsQuantity::Concentration, true).unwrap(),
        0.25,
        epsilon = 1e-12
    );
    assert!(Arc::ptr_eq(&grs, &f.session.grs().unwrap()));
    assert_eq!(f.transport.opens("mem://grs"), 1);

    f.session.unload_all();
    let reloaded = f.session.grs().unwrap();
    assert!(!Arc::ptr_eq(&grs, &reloaded));
    // Reload is a cache hit, not a download.
    assert_eq!(f.transport.opens("mem://grs"), 1);
}
