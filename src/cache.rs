//! Two-tier cache of resolved catalogs, keyed by set id.
//!
//! The memory tier lives as long as the [CatalogCache] and is only ever cleared explicitly. The
//! durable tier is one JSON file per set, valid for the configured duration and shared between
//! processes; entries are replaced atomically so a reader never sees half an entry.

use crate::atomic::write_atomic;
use crate::error::CacheError;
use crate::icon::Icon;
use crate::icon_set::SetId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ENTRY_PREFIX: &str = "set-";

#[derive(Serialize, Deserialize)]
struct DurableEntry {
    /// Seconds since the unix epoch.
    stored_at: u64,
    icons: Vec<Icon>,
}

pub struct CatalogCache {
    memory: RwLock<HashMap<SetId, Arc<Vec<Icon>>>>,
    dir: PathBuf,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        CatalogCache {
            memory: RwLock::new(HashMap::new()),
            dir: dir.into(),
            ttl,
        }
    }

    pub fn get(&self, set_id: SetId) -> Option<Arc<Vec<Icon>>> {
        self.get_at(set_id, SystemTime::now())
    }

    fn get_at(&self, set_id: SetId, now: SystemTime) -> Option<Arc<Vec<Icon>>> {
        if let Some(icons) = self.memory.read().get(&set_id) {
            return Some(Arc::clone(icons));
        }

        let path = self.entry_path(set_id);
        let bytes = std::fs::read(&path).ok()?;
        let entry: DurableEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("dropping corrupt cache entry {path:?}: {_e}");

                remove_entry(&path);
                return None;
            }
        };

        let age = unix_seconds(now).saturating_sub(entry.stored_at);
        if age > self.ttl.as_secs() {
            remove_entry(&path);
            return None;
        }

        let icons = Arc::new(entry.icons);
        self.memory.write().insert(set_id, Arc::clone(&icons));
        Some(icons)
    }

    /// Writes both tiers.
    pub fn put(&self, set_id: SetId, icons: &[Icon]) -> Result<(), CacheError> {
        self.put_at(set_id, icons, SystemTime::now())
    }

    fn put_at(&self, set_id: SetId, icons: &[Icon], now: SystemTime) -> Result<(), CacheError> {
        let entry = DurableEntry {
            stored_at: unix_seconds(now),
            icons: icons.to_vec(),
        };
        write_atomic(&self.entry_path(set_id), &serde_json::to_vec(&entry)?)?;
        self.memory.write().insert(set_id, Arc::new(entry.icons));
        Ok(())
    }

    pub fn invalidate(&self, set_id: SetId) -> Result<(), CacheError> {
        self.memory.write().remove(&set_id);
        remove_file_if_present(&self.entry_path(set_id))?;
        Ok(())
    }

    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        self.memory.write().clear();

        let entries = match self.dir.read_dir() {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries.flatten() {
            let is_entry = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(ENTRY_PREFIX) && name.ends_with(".json"));
            if is_entry {
                remove_file_if_present(&entry.path())?;
            }
        }
        Ok(())
    }

    fn entry_path(&self, set_id: SetId) -> PathBuf {
        self.dir.join(format!("{ENTRY_PREFIX}{set_id}.json"))
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn remove_file_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Best effort: a stale entry another process already removed is fine.
fn remove_entry(path: &Path) {
    if let Err(_e) = remove_file_if_present(path) {
        #[cfg(feature = "log")]
        log::warn!("could not remove cache entry {path:?}: {_e}");
    }
}

#[cfg(test)]
mod test {
    use crate::cache::CatalogCache;
    use crate::icon::{Icon, IconType};
    use std::error::Error;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn icons() -> Vec<Icon> {
        vec![Icon::new(IconType::Sprite, "star", "icon-star")]
    }

    #[test]
    fn test_durable_hit_fills_memory() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let writer = CatalogCache::new(dir.path(), Duration::from_secs(60));
        writer.put(1, &icons())?;

        // a second cache over the same directory, like another process
        let reader = CatalogCache::new(dir.path(), Duration::from_secs(60));
        assert_eq!(reader.get(1).as_deref(), Some(&icons()));

        // now served from memory even without the file
        std::fs::remove_file(dir.path().join("set-1.json"))?;
        assert_eq!(reader.get(1).as_deref(), Some(&icons()));
        assert!(writer.get(2).is_none());

        Ok(())
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let cache = CatalogCache::new(dir.path(), Duration::from_secs(60));
        let stored_at = SystemTime::now() - Duration::from_secs(3600);
        cache.put_at(1, &icons(), stored_at)?;
        cache.memory.write().clear();

        assert!(cache.get(1).is_none());
        assert!(!dir.path().join("set-1.json").exists());

        Ok(())
    }

    #[test]
    fn test_entry_at_ttl_is_still_valid() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let cache = CatalogCache::new(dir.path(), Duration::from_secs(60));
        let now = SystemTime::now();
        cache.put_at(1, &icons(), now)?;
        cache.memory.write().clear();

        assert!(cache.get_at(1, now + Duration::from_secs(60)).is_some());

        Ok(())
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("set-3.json"), "{ half an entr")?;
        let cache = CatalogCache::new(dir.path(), Duration::from_secs(60));

        assert!(cache.get(3).is_none());
        assert!(!dir.path().join("set-3.json").exists());

        Ok(())
    }

    #[test]
    fn test_invalidate() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let cache = CatalogCache::new(dir.path(), Duration::from_secs(60));
        cache.put(1, &icons())?;
        cache.put(2, &icons())?;
        std::fs::write(dir.path().join("unrelated.txt"), "keep me")?;

        cache.invalidate(1)?;
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());

        cache.invalidate_all()?;
        assert!(cache.get(2).is_none());
        assert!(dir.path().join("unrelated.txt").exists());

        // nothing to invalidate is fine
        cache.invalidate(9)?;
        CatalogCache::new(dir.path().join("missing"), Duration::from_secs(1)).invalidate_all()?;

        Ok(())
    }
}
