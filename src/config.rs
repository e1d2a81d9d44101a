use crate::icon_set::IconSetType;
use freedesktop_entry_parser::low_level::{EntryIter, SectionBytes};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECTION: &str = "Icon Manager";

/// Global settings the engine reads as plain values.
///
/// Where these values come from (environment overrides, admin settings) is up to the host; the
/// engine only knows the defaults and a small desktop-entry style file format:
///
/// ```text
/// [Icon Manager]
/// IconSetsPath=/srv/site/icons
/// EnableCache=true
/// CacheDuration=86400
/// EnabledTypes=svg-folder,svg-sprite,font-awesome
///
/// [Icon Manager/dev]
/// EnableCache=false
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base directory that svg-folder, sprite, web-font and custom set paths are relative to.
    pub icon_sets_path: PathBuf,
    /// Directory holding the bundled icon-definition documents of the icon-font services.
    pub definitions_path: PathBuf,
    /// Directory of the durable cache tier.
    pub cache_path: PathBuf,
    pub enable_cache: bool,
    pub cache_duration: Duration,
    pub enabled_types: Vec<IconSetType>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing `[Icon Manager]` section")]
    MissingSection,
    #[error("the input wasn't in utf-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("a bool was expected but failed to parse")]
    ParseBoolError(#[from] std::str::ParseBoolError),
    #[error("a number was expected but failed to parse")]
    ParseNumError(#[from] std::num::ParseIntError),
    #[error("unknown icon set type `{0}`")]
    UnknownType(String),
    #[error("invalid format for a configuration file")]
    ParseError(#[from] freedesktop_entry_parser::ParseError),
    #[error("configuration file could not be read")]
    Io(#[from] std::io::Error),
}

impl Default for Config {
    fn default() -> Self {
        let xdg = xdg::BaseDirectories::with_prefix("icon-manager");
        let data_home = xdg
            .get_data_home()
            .unwrap_or_else(|| std::env::temp_dir().join("icon-manager"));
        let cache_home = xdg
            .get_cache_home()
            .unwrap_or_else(|| std::env::temp_dir().join("icon-manager-cache"));

        Config {
            icon_sets_path: data_home.join("icons"),
            definitions_path: data_home.join("definitions"),
            cache_path: cache_home.join("catalog"),
            enable_cache: true,
            cache_duration: Duration::from_secs(24 * 60 * 60),
            enabled_types: IconSetType::ALL.to_vec(),
        }
    }
}

impl Config {
    /// Both tiers are bypassed when caching is off or the duration is zero.
    pub fn cache_active(&self) -> bool {
        self.enable_cache && !self.cache_duration.is_zero()
    }

    pub fn type_enabled(&self, ty: IconSetType) -> bool {
        self.enabled_types.contains(&ty)
    }

    pub fn from_file(path: &Path, environment: Option<&str>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        match environment {
            Some(env) => Self::parse_for_environment(&bytes, env),
            None => Self::parse(&bytes),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::parse_inner(bytes, None)
    }

    /// Like [Config::parse], then applies the `[Icon Manager/<environment>]` section on top.
    pub fn parse_for_environment(bytes: &[u8], environment: &str) -> Result<Self, ConfigError> {
        Self::parse_inner(bytes, Some(environment))
    }

    fn parse_inner(bytes: &[u8], environment: Option<&str>) -> Result<Self, ConfigError> {
        let entry: EntryIter = freedesktop_entry_parser::low_level::parse_entry(bytes);
        let override_title = environment.map(|env| format!("{SECTION}/{env}"));

        let mut base = None;
        let mut overrides = None;
        for section in entry {
            let section = section?;
            let title = str::from_utf8(section.title)?;
            if title == SECTION {
                base = Some(section);
            } else if override_title.as_deref() == Some(title) {
                overrides = Some(section);
            }
        }

        let base = base.ok_or(ConfigError::MissingSection)?;
        let mut config = Config::default();
        config.apply(&base)?;
        if let Some(overrides) = overrides {
            config.apply(&overrides)?;
        }

        Ok(config)
    }

    fn apply(&mut self, section: &SectionBytes) -> Result<(), ConfigError> {
        if let Some(path) = find_attr(section, "IconSetsPath")? {
            self.icon_sets_path = path.into();
        }
        if let Some(path) = find_attr(section, "DefinitionsPath")? {
            self.definitions_path = path.into();
        }
        if let Some(path) = find_attr(section, "CachePath")? {
            self.cache_path = path.into();
        }
        if let Some(enable) = find_attr(section, "EnableCache")? {
            self.enable_cache = enable.parse()?;
        }
        if let Some(seconds) = find_attr(section, "CacheDuration")? {
            self.cache_duration = Duration::from_secs(seconds.parse()?);
        }
        if let Some(types) = find_attr(section, "EnabledTypes")? {
            self.enabled_types = types
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(|_| ConfigError::UnknownType(s.into())))
                .collect::<Result<_, _>>()?;
        }

        Ok(())
    }
}

fn find_attr<'a>(
    section: &'a SectionBytes,
    name: &str,
) -> Result<Option<&'a str>, std::str::Utf8Error> {
    section
        .attrs
        .iter()
        .find(|attr| attr.name == name.as_bytes() && attr.param.is_none())
        .map(|attr| str::from_utf8(attr.value))
        .transpose()
}

#[cfg(test)]
mod test {
    use crate::config::{Config, ConfigError};
    use crate::icon_set::IconSetType;
    use std::error::Error;
    use std::path::PathBuf;
    use std::time::Duration;

    static EXAMPLE: &str = include_str!("../resources/example.config");

    #[test]
    fn test_parse_example_config() -> Result<(), Box<dyn Error>> {
        let config = Config::parse(EXAMPLE.as_bytes())?;

        assert_eq!(config.icon_sets_path, PathBuf::from("/srv/site/icons"));
        assert_eq!(config.cache_path, PathBuf::from("/var/cache/icons"));
        assert!(config.enable_cache);
        assert_eq!(config.cache_duration, Duration::from_secs(3600));
        assert_eq!(
            config.enabled_types,
            vec![IconSetType::SvgFolder, IconSetType::SvgSprite, IconSetType::FontAwesome]
        );
        assert!(config.cache_active());

        Ok(())
    }

    #[test]
    fn test_environment_section_overrides_base() -> Result<(), Box<dyn Error>> {
        let config = Config::parse_for_environment(EXAMPLE.as_bytes(), "dev")?;

        assert!(!config.enable_cache);
        assert!(!config.cache_active());
        // untouched keys keep the base value
        assert_eq!(config.icon_sets_path, PathBuf::from("/srv/site/icons"));

        Ok(())
    }

    #[test]
    fn test_zero_duration_disables_cache() -> Result<(), Box<dyn Error>> {
        let config = Config::parse(b"[Icon Manager]\nCacheDuration=0\n")?;
        assert!(config.enable_cache);
        assert!(!config.cache_active());
        assert_eq!(config.enabled_types, IconSetType::ALL.to_vec());
        Ok(())
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            Config::parse(b"[Something Else]\nA=b\n"),
            Err(ConfigError::MissingSection)
        ));
        assert!(matches!(
            Config::parse(b"[Icon Manager]\nEnableCache=yes\n"),
            Err(ConfigError::ParseBoolError(_))
        ));
        assert!(matches!(
            Config::parse(b"[Icon Manager]\nEnabledTypes=svg-folder,png\n"),
            Err(ConfigError::UnknownType(t)) if t == "png"
        ));
    }
}
