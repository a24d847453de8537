//! Per-model storage for loaded datasets.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

/// Loaded datasets keyed by model identity.
///
/// Each key has its own lock: concurrent loads of the same model run the
/// loader once and share the result, while loads of different models
/// proceed in parallel. Values are handed out as `Arc`s, so evicting a
/// model never invalidates a handle a caller already holds.
pub struct ModelSlots<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for ModelSlots<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> fmt::Debug for ModelSlots<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSlots")
            .field("keys", &self.slots.lock().len())
            .finish()
    }
}

impl<K: Eq + Hash + Clone, V> ModelSlots<K, V> {
    /// Empty slots.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Slot<V> {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }

    /// The loaded value for `key`, if any. Blocks while a load of the same
    /// key is in progress.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let value = slot.lock().clone();
        value
    }

    /// The loaded value for `key`, running `load` first if needed.
    ///
    /// A failed load leaves the slot empty so the next call retries.
    pub fn get_or_load<E>(&self, key: &K, load: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        let value = Arc::new(load()?);
        *guard = Some(value.clone());
        Ok(value)
    }

    /// Store an already loaded value, replacing any previous one.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        *self.slot(&key).lock() = Some(value.clone());
        value
    }

    /// Drop the value for `key`, returning it if it was loaded.
    pub fn evict(&self, key: &K) -> Option<Arc<V>> {
        let slot = self.slots.lock().remove(key)?;
        let value = slot.lock().take();
        value
    }

    /// Drop every loaded value.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Keys with a loaded value.
    pub fn loaded_keys(&self) -> Vec<K> {
        let slots: Vec<(K, Slot<V>)> = self
            .slots
            .lock()
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(k, _)| k)
            .collect()
    }
}
