use crate::assets::{self, Asset};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{RegistryError, StorageError, ValidationError};
use crate::icon::Icon;
use crate::icon_set::{IconSet, SetId};
use crate::render::RenderContext;
use crate::source::Source;
use crate::storage::Storage;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Points at one icon: the handle of its set and its name within the set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconRef {
    pub set_handle: String,
    pub name: String,
}

impl IconRef {
    pub fn new(set_handle: &str, name: &str) -> Self {
        IconRef {
            set_handle: set_handle.into(),
            name: name.into(),
        }
    }
}

/// Read access to materialized icons.
pub trait CatalogLookup {
    fn icons_for_set(&self, set_id: SetId) -> Result<Arc<Vec<Icon>>, RegistryError>;

    fn icon(&self, set_handle: &str, name: &str) -> Result<Option<Icon>, RegistryError>;

    /// Case-insensitive substring search over names, labels and keywords.
    ///
    /// With no handles every enabled set is searched; an empty query matches everything.
    fn search_icons(&self, query: &str, set_handles: &[&str]) -> Result<Vec<Icon>, RegistryError>;
}

/// Icon sets and their catalogs.
///
/// Every mutation goes through here: it validates, persists, refreshes the catalog and keeps both
/// the set list and the icon caches coherent with storage.
pub struct IconSetRegistry {
    config: Config,
    catalog: Catalog,
    /// Listed sets and when they were read. Other processes sharing the storage can add sets, so
    /// the list is re-read once it is older than the cache duration.
    sets: RwLock<Option<(Instant, Arc<Vec<IconSet>>)>>,
}

impl IconSetRegistry {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        IconSetRegistry {
            catalog: Catalog::new(&config, storage),
            config,
            sets: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Every set, ordered by sort order then name.
    pub fn list(&self) -> Result<Arc<Vec<IconSet>>, StorageError> {
        if let Some((loaded_at, sets)) = self.sets.read().as_ref() {
            if loaded_at.elapsed() <= self.sets_ttl() {
                return Ok(Arc::clone(sets));
            }
        }
        self.reload_sets()
    }

    /// Enabled sets whose type is enabled too.
    pub fn list_enabled(&self) -> Result<Vec<IconSet>, StorageError> {
        Ok(self
            .list()?
            .iter()
            .filter(|set| set.enabled && self.config.type_enabled(set.set_type))
            .cloned()
            .collect())
    }

    pub fn get_by_id(&self, id: SetId) -> Result<Option<IconSet>, StorageError> {
        Ok(self.list()?.iter().find(|set| set.id == Some(id)).cloned())
    }

    /// A handle missing from the listed sets is looked up in storage again before giving up.
    pub fn get_by_handle(&self, handle: &str) -> Result<Option<IconSet>, StorageError> {
        let find = |sets: &[IconSet]| sets.iter().find(|set| set.handle == handle).cloned();
        match find(self.list()?.as_slice()) {
            Some(set) => Ok(Some(set)),
            None => Ok(find(self.reload_sets()?.as_slice())),
        }
    }

    /// Validates and stores `set`, then rebuilds its catalog.
    ///
    /// If the set was stored but its catalog could not be rebuilt, the stored set keeps
    /// [IconSet::needs_refresh] and [RegistryError::Refresh] is returned.
    pub fn save(&self, mut set: IconSet) -> Result<IconSet, RegistryError> {
        self.validate(&set)?;

        set.needs_refresh = true;
        let id = match self.catalog.storage().save_set(&set) {
            Ok(id) => id,
            Err(StorageError::DuplicateHandle(handle)) => {
                self.invalidate_sets();
                return Err(ValidationError::DuplicateHandle(handle).into());
            }
            Err(e) => return Err(e.into()),
        };
        set.id = Some(id);
        self.invalidate_sets();

        self.refresh_saved(set)
    }

    /// Rebuilds the catalog of a stored set from its source.
    pub fn refresh(&self, set: &IconSet) -> Result<IconSet, RegistryError> {
        let id = set.id.ok_or(StorageError::Unsaved)?;
        let stored = self
            .get_by_id(id)?
            .ok_or(StorageError::UnknownSet(id))?;
        self.refresh_saved(stored)
    }

    /// Removes the set, its icons and its cache entries.
    pub fn delete(&self, set: &IconSet) -> Result<(), RegistryError> {
        let id = set.id.ok_or(StorageError::Unsaved)?;
        self.catalog.remove(id)?;
        self.invalidate_sets();

        #[cfg(feature = "log")]
        log::info!("deleted icon set `{}`", set.handle);

        Ok(())
    }

    /// Stylesheets, scripts, fonts and sprites a page needs to display `refs`.
    ///
    /// References to unknown or disabled sets contribute nothing.
    pub fn required_assets(&self, refs: &[IconRef]) -> Result<Vec<Asset>, StorageError> {
        let mut handles: Vec<&str> = Vec::new();
        for r in refs {
            if !handles.contains(&r.set_handle.as_str()) {
                handles.push(&r.set_handle);
            }
        }
        self.assets_for_handles(&handles)
    }

    /// Assets of every set rendered through `context`.
    pub fn context_assets(&self, context: &RenderContext) -> Result<Vec<Asset>, StorageError> {
        let handles: Vec<&str> = context.used_sets().iter().map(String::as_str).collect();
        self.assets_for_handles(&handles)
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(&self.config.icon_sets_path)
    }

    fn assets_for_handles(&self, handles: &[&str]) -> Result<Vec<Asset>, StorageError> {
        let enabled = self.list_enabled()?;
        let assets = handles
            .iter()
            .filter_map(|handle| enabled.iter().find(|set| set.handle == *handle))
            .filter_map(|set| Source::from_set(set).ok())
            .flat_map(|source| source.assets());
        Ok(assets::dedupe(assets))
    }

    fn validate(&self, set: &IconSet) -> Result<(), RegistryError> {
        set.validate()?;
        if !self.config.type_enabled(set.set_type) {
            return Err(ValidationError::TypeDisabled(set.set_type).into());
        }

        // storage has the final say on handles; this read only reports the clash early
        let sets = self.reload_sets()?;
        if sets.iter().any(|other| other.handle == set.handle && other.id != set.id) {
            return Err(ValidationError::DuplicateHandle(set.handle.clone()).into());
        }

        if let Some(id) = set.id {
            let stored = sets
                .iter()
                .find(|other| other.id == Some(id))
                .ok_or(StorageError::UnknownSet(id))?;
            let has_icons = self
                .catalog
                .storage()
                .load_icons(id)?
                .is_some_and(|icons| !icons.is_empty());
            if stored.set_type != set.set_type && has_icons {
                return Err(ValidationError::TypeChanged {
                    from: stored.set_type,
                    to: set.set_type,
                }
                .into());
            }
        }

        Source::from_set(set)?;
        Ok(())
    }

    fn refresh_saved(&self, mut set: IconSet) -> Result<IconSet, RegistryError> {
        let id = set.id.ok_or(StorageError::Unsaved)?;

        match self.catalog.refresh(&set) {
            Ok(_) => {
                if set.needs_refresh {
                    set.needs_refresh = false;
                    self.catalog.storage().save_set(&set)?;
                    self.invalidate_sets();
                }
                Ok(set)
            }
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("icon set `{}` needs a refresh: {e}", set.handle);

                if !set.needs_refresh {
                    set.needs_refresh = true;
                    if let Err(_flag) = self.catalog.storage().save_set(&set) {
                        #[cfg(feature = "log")]
                        log::error!("could not flag icon set `{}`: {_flag}", set.handle);
                    }
                    self.invalidate_sets();
                }
                Err(RegistryError::Refresh {
                    set_id: id,
                    source: Box::new(e),
                })
            }
        }
    }

    fn reload_sets(&self) -> Result<Arc<Vec<IconSet>>, StorageError> {
        let mut sets = self.catalog.storage().load_sets()?;
        sets.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        let sets = Arc::new(sets);
        *self.sets.write() = Some((Instant::now(), Arc::clone(&sets)));
        Ok(sets)
    }

    fn sets_ttl(&self) -> Duration {
        if self.config.cache_active() {
            self.config.cache_duration
        } else {
            Duration::ZERO
        }
    }

    fn invalidate_sets(&self) {
        *self.sets.write() = None;
    }
}

impl CatalogLookup for IconSetRegistry {
    fn icons_for_set(&self, set_id: SetId) -> Result<Arc<Vec<Icon>>, RegistryError> {
        let set = self
            .get_by_id(set_id)?
            .ok_or(StorageError::UnknownSet(set_id))?;
        Ok(self.catalog.icons_for(&set)?)
    }

    fn icon(&self, set_handle: &str, name: &str) -> Result<Option<Icon>, RegistryError> {
        let Some(set) = self.get_by_handle(set_handle)? else {
            return Ok(None);
        };
        let icons = self.catalog.icons_for(&set)?;
        Ok(icons.iter().find(|icon| icon.name == name).cloned())
    }

    fn search_icons(&self, query: &str, set_handles: &[&str]) -> Result<Vec<Icon>, RegistryError> {
        let needle = query.trim().to_lowercase();
        let sets: Vec<IconSet> = self
            .list_enabled()?
            .into_iter()
            .filter(|set| set_handles.is_empty() || set_handles.contains(&set.handle.as_str()))
            .collect();

        let mut found = Vec::new();
        for set in &sets {
            let icons = self.catalog.icons_for(set)?;
            found.extend(icons.iter().filter(|icon| icon.matches(&needle)).cloned());
        }
        Ok(found)
    }
}
