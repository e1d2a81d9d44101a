//! Source adapters: one per icon set type, each turning the set's raw source into icons.
//!
//! [Source] is built from an [IconSet]'s settings (which is where configuration errors surface)
//! and then [resolved](Source::resolve) against the file system. Resolving never fails: an
//! unavailable source is logged and resolves to no icons.

mod custom;
mod font_awesome;
mod material;
mod sprite;
mod svg_folder;
mod web_font;

pub use custom::CustomFont;
pub use font_awesome::{FontAwesome, FontAwesomeLicense};
pub use material::{ClassicStyle, MaterialIcons, SymbolStyle};
pub use sprite::SvgSprite;
pub use svg_folder::SvgFolder;
pub use web_font::WebFont;

use crate::assets::Asset;
use crate::config::Config;
use crate::error::{AdapterError, ValidationError};
use crate::icon::Icon;
use crate::icon_set::{IconSet, IconSetType};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Directories the adapters read from.
#[derive(Debug, Clone)]
pub struct SourceEnv {
    pub icon_sets_path: PathBuf,
    pub definitions_path: PathBuf,
}

impl From<&Config> for SourceEnv {
    fn from(config: &Config) -> Self {
        SourceEnv {
            icon_sets_path: config.icon_sets_path.clone(),
            definitions_path: config.definitions_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    SvgFolder(SvgFolder),
    SvgSprite(SvgSprite),
    WebFont(WebFont),
    FontAwesome(FontAwesome),
    MaterialIcons(MaterialIcons),
    Custom(CustomFont),
}

impl Source {
    /// Reads and checks the type-specific settings of `set`.
    pub fn from_set(set: &IconSet) -> Result<Self, ValidationError> {
        let settings = &set.settings;
        let source = match set.set_type {
            IconSetType::SvgFolder => Source::SvgFolder(SvgFolder::from_settings(settings)?),
            IconSetType::SvgSprite => Source::SvgSprite(SvgSprite::from_settings(settings)?),
            IconSetType::WebFont => Source::WebFont(WebFont::from_settings(settings)?),
            IconSetType::FontAwesome => Source::FontAwesome(FontAwesome::from_settings(settings)?),
            IconSetType::MaterialIcons => {
                Source::MaterialIcons(MaterialIcons::from_settings(settings)?)
            }
            IconSetType::Custom => Source::Custom(CustomFont::from_settings(settings)?),
        };

        Ok(source)
    }

    /// Scans the source. Icons come back sorted by name, unique by name.
    pub fn resolve(&self, env: &SourceEnv) -> Vec<Icon> {
        let scanned = match self {
            Source::SvgFolder(s) => s.scan(env),
            Source::SvgSprite(s) => s.scan(env),
            Source::WebFont(s) => s.scan(env),
            Source::FontAwesome(s) => s.scan(env),
            Source::MaterialIcons(s) => s.scan(env),
            Source::Custom(s) => s.scan(env),
        };

        match scanned {
            Ok(icons) => unique_by_name(icons),
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("icon source unavailable, resolving to no icons: {_e}");

                Vec::new()
            }
        }
    }

    /// Page assets needed to display icons of this source.
    pub fn assets(&self) -> Vec<Asset> {
        match self {
            Source::SvgFolder(_) => Vec::new(),
            Source::SvgSprite(s) => s.assets(),
            Source::WebFont(s) => s.assets(),
            Source::FontAwesome(s) => s.assets(),
            Source::MaterialIcons(s) => s.assets(),
            Source::Custom(s) => s.assets(),
        }
    }
}

fn unique_by_name(mut icons: Vec<Icon>) -> Vec<Icon> {
    // stable: the first icon scanned under a name wins
    icons.sort_by(|a, b| a.name.cmp(&b.name));
    let mut seen = BTreeSet::new();
    icons.retain(|icon| {
        let fresh = seen.insert(icon.name.clone());
        #[cfg(feature = "log")]
        if !fresh {
            log::debug!("skipping duplicate icon name `{}`", icon.name);
        }
        fresh
    });
    icons
}

/// Label and keywords supplied next to a source.
#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct IconMetadata {
    pub label: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl IconMetadata {
    pub fn apply(&self, icon: &mut Icon) {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            icon.label = label.trim().to_string();
        }
        icon.keywords
            .extend(self.keywords.iter().map(|k| k.trim().to_string()).filter(|k| !k.is_empty()));
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AdapterError> {
    if !path.is_file() {
        return Err(AdapterError::NotFound(path.to_owned()));
    }
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Settings paths are relative to the icon sets directory and may not climb out of it.
pub(crate) fn relative_path(key: &'static str, value: &str) -> Result<PathBuf, ValidationError> {
    let path = PathBuf::from(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ValidationError::InvalidSetting {
            key,
            reason: format!("`{value}` must be a path inside the icon sets directory"),
        });
    }
    Ok(path)
}

/// Forward-slash form of a relative path, independent of the host platform.
pub(crate) fn portable(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod test {
    use crate::error::ValidationError;
    use crate::icon::{Icon, IconType};
    use crate::icon_set::{IconSet, IconSetType};
    use crate::source::{Source, SourceEnv, portable, relative_path, unique_by_name};
    use std::path::Path;

    #[test]
    fn test_relative_paths() {
        assert!(relative_path("folder", "brand/outline").is_ok());
        assert!(relative_path("folder", "./brand").is_ok());
        assert!(relative_path("folder", "../secrets").is_err());
        assert!(relative_path("folder", "/etc").is_err());
        assert_eq!(portable(Path::new("./brand/outline/x.svg")), "brand/outline/x.svg");
    }

    #[test]
    fn test_unique_by_name() {
        let icons = vec![
            Icon::new(IconType::Svg, "b", "first/b.svg"),
            Icon::new(IconType::Svg, "a", "a.svg"),
            Icon::new(IconType::Svg, "b", "second/b.svg"),
        ];
        let icons = unique_by_name(icons);
        let values: Vec<_> = icons.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["a.svg", "first/b.svg"]);
    }

    #[test]
    fn test_missing_required_setting() {
        let set = IconSet::new("sprites", "Sprites", IconSetType::SvgSprite);
        assert_eq!(
            Source::from_set(&set),
            Err(ValidationError::MissingSetting("sprite_file"))
        );
    }

    #[test]
    fn test_unavailable_source_resolves_empty() {
        let set = IconSet::new("sprites", "Sprites", IconSetType::SvgSprite)
            .with_setting("sprite_file", "missing.svg");
        let env = SourceEnv {
            icon_sets_path: "/nonexistent/icons".into(),
            definitions_path: "/nonexistent/defs".into(),
        };
        let source = Source::from_set(&set).unwrap();
        assert!(source.resolve(&env).is_empty());
    }
}
