//! Persistence of icon set definitions and their materialized icons.
//!
//! Two tables: icon sets, and icons keyed by `(set id, name)`. Deleting a set removes its icons.
//! Replacing a set's icons is all-or-nothing.

use crate::atomic::write_atomic;
use crate::error::StorageError;
use crate::icon::Icon;
use crate::icon_set::{IconSet, SetId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    fn load_sets(&self) -> Result<Vec<IconSet>, StorageError>;

    /// Inserts a set without an id (assigning one) or updates an existing one.
    ///
    /// Handles are unique across all sets.
    fn save_set(&self, set: &IconSet) -> Result<SetId, StorageError>;

    /// Removes the set and every icon materialized for it.
    fn delete_set(&self, id: SetId) -> Result<(), StorageError>;

    /// Icons of a set ordered by name; `None` if the set has never been materialized.
    fn load_icons(&self, set_id: SetId) -> Result<Option<Vec<Icon>>, StorageError>;

    /// Swaps the whole catalog of a set. On error the previous icons stay in place.
    fn replace_icons(&self, set_id: SetId, icons: &[Icon]) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    next_id: SetId,
    sets: BTreeMap<SetId, IconSet>,
    icons: BTreeMap<SetId, Vec<Icon>>,
}

impl Tables {
    fn save_set(&mut self, set: &IconSet) -> Result<SetId, StorageError> {
        if self.sets.values().any(|other| other.handle == set.handle && other.id != set.id) {
            return Err(StorageError::DuplicateHandle(set.handle.clone()));
        }

        let id = match set.id {
            Some(id) if self.sets.contains_key(&id) => id,
            Some(id) => return Err(StorageError::UnknownSet(id)),
            None => {
                self.next_id += 1;
                self.next_id
            }
        };

        let mut row = set.clone();
        row.id = Some(id);
        self.sets.insert(id, row);
        Ok(id)
    }

    fn delete_set(&mut self, id: SetId) {
        self.sets.remove(&id);
        self.icons.remove(&id);
    }

    fn replace_icons(&mut self, set_id: SetId, icons: &[Icon]) -> Result<(), StorageError> {
        if !self.sets.contains_key(&set_id) {
            return Err(StorageError::UnknownSet(set_id));
        }

        let mut names = BTreeSet::new();
        if let Some(dup) = icons.iter().find(|icon| !names.insert(icon.name.as_str())) {
            return Err(StorageError::DuplicateIcon {
                set_id,
                name: dup.name.clone(),
            });
        }

        let mut rows = icons.to_vec();
        for row in &mut rows {
            row.icon_set_id = set_id;
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        self.icons.insert(set_id, rows);
        Ok(())
    }
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load_sets(&self) -> Result<Vec<IconSet>, StorageError> {
        Ok(self.tables.read().sets.values().cloned().collect())
    }

    fn save_set(&self, set: &IconSet) -> Result<SetId, StorageError> {
        self.tables.write().save_set(set)
    }

    fn delete_set(&self, id: SetId) -> Result<(), StorageError> {
        self.tables.write().delete_set(id);
        Ok(())
    }

    fn load_icons(&self, set_id: SetId) -> Result<Option<Vec<Icon>>, StorageError> {
        Ok(self.tables.read().icons.get(&set_id).cloned())
    }

    fn replace_icons(&self, set_id: SetId, icons: &[Icon]) -> Result<(), StorageError> {
        self.tables.write().replace_icons(set_id, icons)
    }
}

/// Both tables in one JSON document, replaced atomically on every write.
///
/// Every read goes to disk, so several processes can share one file. Writers hold an exclusive
/// lock on `<path>.lock` for the whole read-modify-write, in this process and across processes.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");

        FileStorage {
            path,
            lock_path: lock_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Blocks until no other writer holds the document. Released when the file is dropped.
    fn lock_document(&self) -> Result<File, StorageError> {
        if let Some(dir) = self.lock_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.lock()?;
        Ok(file)
    }

    fn read(&self) -> Result<Tables, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self.write_lock.lock();
        let _document = self.lock_document()?;
        let mut tables = self.read()?;
        let result = f(&mut tables)?;
        write_atomic(&self.path, &serde_json::to_vec(&tables)?)?;
        Ok(result)
    }
}

impl Storage for FileStorage {
    fn load_sets(&self) -> Result<Vec<IconSet>, StorageError> {
        Ok(self.read()?.sets.into_values().collect())
    }

    fn save_set(&self, set: &IconSet) -> Result<SetId, StorageError> {
        self.update(|tables| tables.save_set(set))
    }

    fn delete_set(&self, id: SetId) -> Result<(), StorageError> {
        self.update(|tables| {
            tables.delete_set(id);
            Ok(())
        })
    }

    fn load_icons(&self, set_id: SetId) -> Result<Option<Vec<Icon>>, StorageError> {
        Ok(self.read()?.icons.remove(&set_id))
    }

    fn replace_icons(&self, set_id: SetId, icons: &[Icon]) -> Result<(), StorageError> {
        self.update(|tables| tables.replace_icons(set_id, icons))
    }
}

#[cfg(test)]
mod test {
    use crate::error::StorageError;
    use crate::icon::{Icon, IconType};
    use crate::icon_set::{IconSet, IconSetType};
    use crate::storage::{FileStorage, MemoryStorage, Storage};
    use std::error::Error;
    use tempfile::TempDir;

    fn exercise(storage: &dyn Storage) -> Result<(), Box<dyn Error>> {
        let set = IconSet::new("ui", "UI", IconSetType::SvgFolder);
        let id = storage.save_set(&set)?;
        assert_eq!(storage.load_icons(id)?, None);

        let icons = vec![
            Icon::new(IconType::Svg, "b", "ui/b.svg"),
            Icon::new(IconType::Svg, "a", "ui/a.svg"),
        ];
        storage.replace_icons(id, &icons)?;
        let stored = storage.load_icons(id)?.ok_or("icons missing")?;
        let names: Vec<_> = stored.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(stored.iter().all(|i| i.icon_set_id == id));

        // a rejected replacement leaves the previous catalog
        let duplicate = vec![
            Icon::new(IconType::Svg, "c", "ui/c.svg"),
            Icon::new(IconType::Svg, "c", "ui/other/c.svg"),
        ];
        assert!(matches!(
            storage.replace_icons(id, &duplicate),
            Err(StorageError::DuplicateIcon { .. })
        ));
        assert_eq!(storage.load_icons(id)?.map(|i| i.len()), Some(2));

        // an empty catalog is still a materialized one
        storage.replace_icons(id, &[])?;
        assert_eq!(storage.load_icons(id)?, Some(Vec::new()));

        // handles are unique, whether inserting or renaming
        let other = IconSet::new("ui", "Other UI", IconSetType::SvgSprite);
        assert!(matches!(
            storage.save_set(&other),
            Err(StorageError::DuplicateHandle(handle)) if handle == "ui"
        ));
        let other_id = storage.save_set(&IconSet::new("brand", "Brand", IconSetType::SvgFolder))?;
        let mut clash = IconSet::new("ui", "Brand", IconSetType::SvgFolder);
        clash.id = Some(other_id);
        assert!(matches!(storage.save_set(&clash), Err(StorageError::DuplicateHandle(_))));
        storage.delete_set(other_id)?;

        let mut renamed = storage.load_sets()?.pop().ok_or("set missing")?;
        renamed.name = "Interface".into();
        assert_eq!(storage.save_set(&renamed)?, id);
        assert_eq!(storage.load_sets()?[0].name, "Interface");

        storage.delete_set(id)?;
        assert!(storage.load_sets()?.is_empty());
        assert_eq!(storage.load_icons(id)?, None);
        assert!(matches!(
            storage.replace_icons(id, &icons),
            Err(StorageError::UnknownSet(_))
        ));

        Ok(())
    }

    #[test]
    fn test_memory_storage() -> Result<(), Box<dyn Error>> {
        exercise(&MemoryStorage::new())
    }

    #[test]
    fn test_file_storage() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        exercise(&FileStorage::new(dir.path().join("catalog.json")))
    }

    #[test]
    fn test_file_storage_survives_reopen() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("catalog.json");

        let id = FileStorage::new(&path).save_set(&IconSet::new("ui", "UI", IconSetType::SvgFolder))?;
        FileStorage::new(&path).replace_icons(id, &[Icon::new(IconType::Svg, "a", "ui/a.svg")])?;

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.load_sets()?[0].id, Some(id));
        assert_eq!(reopened.load_icons(id)?.map(|i| i.len()), Some(1));

        Ok(())
    }

    #[test]
    fn test_file_storage_writers_do_not_lose_updates() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("catalog.json");
        let setup = FileStorage::new(&path);
        let first = setup.save_set(&IconSet::new("ui", "UI", IconSetType::SvgFolder))?;
        let second = setup.save_set(&IconSet::new("brand", "Brand", IconSetType::SvgFolder))?;

        // separate instances share nothing in memory, like two worker processes
        std::thread::scope(|scope| {
            for (id, prefix) in [(first, "ui"), (second, "brand")] {
                let storage = FileStorage::new(&path);
                scope.spawn(move || {
                    for round in 1..=20 {
                        let icons: Vec<Icon> = (0..round)
                            .map(|n| {
                                let name = format!("{prefix}-{n}");
                                Icon::new(IconType::Svg, &name, &format!("{prefix}/{name}.svg"))
                            })
                            .collect();
                        storage.replace_icons(id, &icons).unwrap();
                    }
                });
            }
        });

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.load_icons(first)?.map(|i| i.len()), Some(20));
        assert_eq!(reopened.load_icons(second)?.map(|i| i.len()), Some(20));
        assert!(dir.path().join("catalog.json.lock").exists());

        Ok(())
    }
}
