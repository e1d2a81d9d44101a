use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType};
use crate::icon_set::SetSettings;
use crate::source::{IconMetadata, SourceEnv, portable, read_json, relative_path};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A directory of standalone `.svg` files.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgFolder {
    /// Relative to the icon sets directory.
    pub folder: PathBuf,
    pub recurse: bool,
    /// Optional JSON file inside the folder mapping icon names to labels and keywords.
    pub metadata_file: Option<String>,
}

impl SvgFolder {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        let folder = relative_path("folder", settings.required_str("folder")?)?;

        Ok(SvgFolder {
            folder,
            recurse: settings.bool("recurse"),
            metadata_file: settings.str("metadata_file").map(Into::into),
        })
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let base = env.icon_sets_path.join(&self.folder);
        if !base.is_dir() {
            return Err(AdapterError::NotFound(base));
        }

        let folder_metadata: BTreeMap<String, IconMetadata> = match &self.metadata_file {
            Some(file) => read_json(&base.join(file)).unwrap_or_else(|_e| {
                #[cfg(feature = "log")]
                log::warn!("ignoring unreadable icon metadata {file:?}: {_e}");

                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };

        let mut files = Vec::new();
        collect_svgs(&base, Path::new(""), self.recurse, &mut files);
        files.sort();

        let icons = files
            .into_iter()
            .filter_map(|relative| {
                let name = relative.file_stem()?.to_str()?.to_string();
                let value = portable(&self.folder.join(&relative));
                let mut icon = Icon::new(IconType::Svg, &name, &value);

                if let Some(metadata) = folder_metadata.get(&name) {
                    metadata.apply(&mut icon);
                }
                // a per-icon sidecar beats the folder-wide file
                let sidecar = base.join(&relative).with_extension("json");
                if sidecar.is_file() {
                    if let Ok(metadata) = read_json::<IconMetadata>(&sidecar) {
                        metadata.apply(&mut icon);
                    }
                }

                Some(icon)
            })
            .collect();

        Ok(icons)
    }
}

/// Pushes paths (relative to `base`) of every usable svg under `base/sub`.
fn collect_svgs(base: &Path, sub: &Path, recurse: bool, files: &mut Vec<PathBuf>) {
    let Ok(entries) = base.join(sub).read_dir() else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let relative = sub.join(file_name);

        if file_type.is_dir() {
            if recurse && !file_name.starts_with('.') {
                collect_svgs(base, &relative, recurse, files);
            }
            continue;
        }

        // `_draft.svg` and friends are work in progress
        if file_name.starts_with('_') || file_name.starts_with('.') {
            continue;
        }
        let is_svg = Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            files.push(relative);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::icon_set::{IconSet, IconSetType};
    use crate::source::{Source, SourceEnv};
    use std::error::Error;
    use std::fs;
    use tempfile::TempDir;

    fn env(dir: &TempDir) -> SourceEnv {
        SourceEnv {
            icon_sets_path: dir.path().to_owned(),
            definitions_path: dir.path().join("definitions"),
        }
    }

    fn folder_set(recurse: bool) -> IconSet {
        IconSet::new("ui", "UI", IconSetType::SvgFolder)
            .with_setting("folder", "ui")
            .with_setting("recurse", recurse)
    }

    fn fixture() -> Result<TempDir, Box<dyn Error>> {
        let dir = TempDir::new()?;
        let ui = dir.path().join("ui");
        fs::create_dir_all(ui.join("nested"))?;
        fs::write(ui.join("arrow-left.svg"), "<svg/>")?;
        fs::write(ui.join("arrow_right.svg"), "<svg/>")?;
        fs::write(ui.join("_draft.svg"), "<svg/>")?;
        fs::write(ui.join("notes.txt"), "not an icon")?;
        fs::write(ui.join("nested/gear.SVG"), "<svg/>")?;
        Ok(dir)
    }

    #[test]
    fn test_shallow_scan_skips_drafts() -> Result<(), Box<dyn Error>> {
        let dir = fixture()?;

        let icons = Source::from_set(&folder_set(false))?.resolve(&env(&dir));

        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["arrow-left", "arrow_right"]);
        assert_eq!(icons[0].value, "ui/arrow-left.svg");
        assert_eq!(icons[0].label, "Arrow Left");
        assert_eq!(icons[1].label, "Arrow Right");

        Ok(())
    }

    #[test]
    fn test_recursive_scan_keeps_relative_paths() -> Result<(), Box<dyn Error>> {
        let dir = fixture()?;

        let icons = Source::from_set(&folder_set(true))?.resolve(&env(&dir));

        let gear = icons.iter().find(|i| i.name == "gear").ok_or("gear missing")?;
        assert_eq!(gear.value, "ui/nested/gear.SVG");
        assert!(icons.iter().all(|i| !i.value.starts_with('/')));
        assert_eq!(icons.len(), 3);

        Ok(())
    }

    #[test]
    fn test_metadata_files() -> Result<(), Box<dyn Error>> {
        let dir = fixture()?;
        let ui = dir.path().join("ui");
        fs::write(
            ui.join("icons.json"),
            r#"{"arrow-left": {"label": "Back", "keywords": ["previous", "return"]},
                "arrow_right": {"keywords": ["next"]}}"#,
        )?;
        fs::write(ui.join("arrow_right.json"), r#"{"label": "Forward"}"#)?;

        let set = folder_set(false).with_setting("metadata_file", "icons.json");
        let icons = Source::from_set(&set)?.resolve(&env(&dir));

        assert_eq!(icons[0].label, "Back");
        assert!(icons[0].keywords.contains("previous"));
        assert_eq!(icons[1].label, "Forward");
        assert!(icons[1].keywords.contains("next"));

        Ok(())
    }

    #[test]
    fn test_missing_folder_is_empty() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        assert!(Source::from_set(&folder_set(true))?.resolve(&env(&dir)).is_empty());
        Ok(())
    }
}
