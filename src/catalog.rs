//! The materialized catalog of every icon set, behind the cache.
//!
//! Writes to one set's catalog are serialized by a per-set lock; the cache entry of a set is only
//! invalidated once the storage transaction that replaced its icons has committed.

use crate::cache::CatalogCache;
use crate::config::Config;
use crate::error::{RegistryError, StorageError};
use crate::icon::Icon;
use crate::icon_set::{IconSet, SetId};
use crate::source::{Source, SourceEnv};
use crate::storage::Storage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Catalog {
    storage: Arc<dyn Storage>,
    cache: CatalogCache,
    cache_active: bool,
    env: SourceEnv,
    locks: Mutex<HashMap<SetId, Arc<Mutex<()>>>>,
}

impl Catalog {
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> Self {
        Catalog {
            storage,
            cache: CatalogCache::new(&config.cache_path, config.cache_duration),
            cache_active: config.cache_active(),
            env: SourceEnv::from(config),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Icons of a saved set, sorted by name.
    ///
    /// Served from the cache when caching is on, otherwise straight from storage. A set that was
    /// never materialized is resolved and stored on first access.
    pub fn icons_for(&self, set: &IconSet) -> Result<Arc<Vec<Icon>>, StorageError> {
        let id = set.id.ok_or(StorageError::Unsaved)?;

        if self.cache_active {
            if let Some(icons) = self.cache.get(id) {
                return Ok(icons);
            }
        }

        // held across load and put so a concurrent refresh cannot be overwritten by stale icons
        let lock = self.lock_for(id);
        let _guard = lock.lock();

        let icons = match self.storage.load_icons(id)? {
            Some(icons) => icons,
            None => self.materialize(set, id)?,
        };

        if self.cache_active {
            if let Err(_e) = self.cache.put(id, &icons) {
                #[cfg(feature = "log")]
                log::warn!("could not cache icons of set {id}: {_e}");
            }
        }

        Ok(Arc::new(icons))
    }

    /// Re-resolves the set's source and replaces its stored icons. Returns the new icon count.
    pub fn refresh(&self, set: &IconSet) -> Result<usize, RegistryError> {
        let id = set.id.ok_or(StorageError::Unsaved)?;
        let source = Source::from_set(set)?;

        let lock = self.lock_for(id);
        let _guard = lock.lock();

        let icons = self.resolve(set, id, &source);
        self.storage.replace_icons(id, &icons)?;
        self.cache.invalidate(id)?;

        #[cfg(feature = "log")]
        log::info!("refreshed icon set `{}`: {} icons", set.handle, icons.len());

        Ok(icons.len())
    }

    /// Deletes the set with its icons, then its cache entry.
    pub fn remove(&self, id: SetId) -> Result<(), RegistryError> {
        let lock = self.lock_for(id);
        {
            let _guard = lock.lock();
            self.storage.delete_set(id)?;
            self.cache.invalidate(id)?;
        }
        self.locks.lock().remove(&id);
        Ok(())
    }

    pub fn invalidate(&self, id: SetId) -> Result<(), RegistryError> {
        Ok(self.cache.invalidate(id)?)
    }

    pub fn invalidate_all(&self) -> Result<(), RegistryError> {
        Ok(self.cache.invalidate_all()?)
    }

    /// Called with the set's lock held.
    fn materialize(&self, set: &IconSet, id: SetId) -> Result<Vec<Icon>, StorageError> {
        let icons = match Source::from_set(set) {
            Ok(source) => self.resolve(set, id, &source),
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("icon set `{}` has invalid settings: {_e}", set.handle);

                Vec::new()
            }
        };
        self.storage.replace_icons(id, &icons)?;
        Ok(icons)
    }

    fn resolve(&self, set: &IconSet, id: SetId, source: &Source) -> Vec<Icon> {
        let mut icons = source.resolve(&self.env);
        for icon in &mut icons {
            icon.icon_set_id = id;
            icon.icon_set_handle = set.handle.clone();
        }
        icons
    }

    fn lock_for(&self, id: SetId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id).or_default())
    }
}
