//! A cache plus the datasets loaded through it.

use crate::bouguer::{Bouguer, BouguerModel};
use crate::datasets::{builtin_registry, moho_layout};
use crate::decode::ShExpander;
use crate::dichotomy::Dichotomy;
use crate::grs::Grs;
use crate::mag::{MagField, MagModel};
use crate::moho::{Moho, MohoParams};
use crate::slots::ModelSlots;
use crate::topo::{TopoModel, Topography};
use crate::Result;
use redplanet_cache::{CacheConfig, DatasetCache, StaticRegistry};
use std::fmt;
use std::sync::Arc;

/// Entry point for dataset queries.
///
/// Each accessor loads its dataset on first use and hands out a shared
/// handle; later calls with the same model return the same handle. Loads of
/// one model are serialized, loads of different models run in parallel.
///
/// # Example
///
/// ```no_run
/// use redplanet_cache::{CacheConfig, StaticRegistry};
/// use redplanet_data::{Session, TopoModel};
///
/// let session = Session::with_config(CacheConfig::default(), StaticRegistry::load("datasets.yaml")?)?;
///
/// let dichotomy = session.dichotomy()?;
/// let topo = session.topography(TopoModel::Dem463m)?;
/// println!(
///     "Olympus Mons summit: {} m (north of dichotomy: {})",
///     topo.get_interpolated(-134.0, 18.65)?,
///     dichotomy.is_above(-134.0, 18.65)?
/// );
/// # Ok::<(), redplanet_data::DataError>(())
/// ```
pub struct Session {
    cache: DatasetCache,
    expander: Option<Arc<dyn ShExpander>>,
    dichotomy: ModelSlots<(), Dichotomy>,
    topo: ModelSlots<TopoModel, Topography>,
    moho: ModelSlots<MohoParams, Moho>,
    bouguer: ModelSlots<BouguerModel, Bouguer>,
    mag: ModelSlots<(MagModel, u32), MagField>,
    grs: ModelSlots<(), Grs>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cache", &self.cache)
            .field("expander", &self.expander.is_some())
            .field("topo", &self.topo.loaded_keys())
            .field("moho", &self.moho.loaded_keys())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an existing cache.
    pub fn new(cache: DatasetCache) -> Self {
        Self {
            cache,
            expander: None,
            dichotomy: ModelSlots::new(),
            topo: ModelSlots::new(),
            moho: ModelSlots::new(),
            bouguer: ModelSlots::new(),
            mag: ModelSlots::new(),
            grs: ModelSlots::new(),
        }
    }

    /// Build a cache over the built-in registry with `extra` entries merged
    /// on top.
    pub fn with_config(config: CacheConfig, extra: StaticRegistry) -> Result<Self> {
        let registry = builtin_registry().merge(extra);
        Ok(Self::new(DatasetCache::new(config, Arc::new(registry))?))
    }

    /// Use `expander` for spherical-harmonic datasets.
    pub fn with_expander(mut self, expander: Arc<dyn ShExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    /// The underlying cache.
    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// The crustal dichotomy.
    pub fn dichotomy(&self) -> Result<Arc<Dichotomy>> {
        self.dichotomy.get_or_load(&(), || Dichotomy::load(&self.cache))
    }

    /// A topography model.
    pub fn topography(&self, model: TopoModel) -> Result<Arc<Topography>> {
        self.topo.get_or_load(&model, || Topography::load(&self.cache, model))
    }

    /// A crustal thickness model.
    pub fn moho(&self, params: MohoParams) -> Result<Arc<Moho>> {
        self.moho
            .get_or_load(&params, || Moho::load(&self.cache, self.expander.as_deref(), params))
    }

    /// A crustal thickness model, or `None` if no model has these
    /// parameters.
    pub fn try_moho(&self, params: MohoParams) -> Result<Option<Arc<Moho>>> {
        if !self.cache.index(&moho_layout())?.contains(&params.key()) {
            return Ok(None);
        }
        self.moho(params).map(Some)
    }

    /// Crustal density at a point under the given crustal model.
    pub fn crustal_density(&self, params: MohoParams, lon: f64, lat: f64) -> Result<f64> {
        let moho = self.moho(params)?;
        moho.density(lon, lat, &*self.dichotomy()?)
    }

    /// A Bouguer anomaly model.
    pub fn bouguer(&self, model: BouguerModel) -> Result<Arc<Bouguer>> {
        self.bouguer.get_or_load(&model, || Bouguer::load(&self.cache, model))
    }

    /// A magnetic field model expanded to degree `lmax`.
    pub fn mag(&self, model: MagModel, lmax: u32) -> Result<Arc<MagField>> {
        self.mag.get_or_load(&(model, lmax), || {
            MagField::load(&self.cache, self.expander.as_deref(), model, lmax)
        })
    }

    /// The GRS element maps.
    pub fn grs(&self) -> Result<Arc<Grs>> {
        self.grs.get_or_load(&(), || Grs::load(&self.cache))
    }

    /// Drop every loaded dataset. Handles already handed out stay valid.
    pub fn unload_all(&self) {
        self.dichotomy.clear();
        self.topo.clear();
        self.moho.clear();
        self.bouguer.clear();
        self.mag.clear();
        self.grs.clear();
    }
}
