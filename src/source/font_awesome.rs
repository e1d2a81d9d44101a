use crate::assets::Asset;
use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType, meta, title_case};
use crate::icon_set::SetSettings;
use crate::source::{SourceEnv, read_json};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

const STYLES: [&str; 6] = ["solid", "regular", "light", "thin", "duotone", "brands"];
const DEFAULT_STYLES: [&str; 3] = ["solid", "regular", "brands"];
const DEFAULT_VERSION: &str = "6.5.2";

/// Font Awesome, loaded from the CDN or through a kit.
#[derive(Debug, Clone, PartialEq)]
pub enum FontAwesome {
    Cdn {
        /// Full release, e.g. `6.5.2`; definitions are bundled per major version.
        version: String,
        license: FontAwesomeLicense,
        styles: Vec<String>,
    },
    /// Kits load their icons client side; nothing can be enumerated up front.
    Kit { kit_code: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FontAwesomeLicense {
    Free,
    Pro,
}

impl fmt::Display for FontAwesomeLicense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FontAwesomeLicense::Free => "free",
            FontAwesomeLicense::Pro => "pro",
        })
    }
}

/// One entry of a bundled `<major>-<license>.json` definitions document.
#[derive(Debug, Deserialize)]
struct Definition {
    label: Option<String>,
    #[serde(default)]
    styles: Vec<String>,
    unicode: Option<String>,
    #[serde(default)]
    search: Search,
}

#[derive(Debug, Default, Deserialize)]
struct Search {
    #[serde(default)]
    terms: Vec<String>,
}

impl FontAwesome {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        match settings.str("mode").unwrap_or("cdn") {
            "kit" => Ok(FontAwesome::Kit {
                kit_code: settings.required_str("kit_code")?.into(),
            }),
            "cdn" => {
                let version = settings.str("version").unwrap_or(DEFAULT_VERSION);
                if !version.split('.').all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
                    return Err(ValidationError::InvalidSetting {
                        key: "version",
                        reason: format!("`{version}` is not a release number"),
                    });
                }

                let license = match settings.str("license").unwrap_or("free") {
                    "free" => FontAwesomeLicense::Free,
                    "pro" => FontAwesomeLicense::Pro,
                    other => {
                        return Err(ValidationError::InvalidSetting {
                            key: "license",
                            reason: format!("`{other}` is neither `free` nor `pro`"),
                        });
                    }
                };

                let mut styles = settings.list("styles");
                if let Some(unknown) = styles.iter().find(|s| !STYLES.contains(&s.as_str())) {
                    return Err(ValidationError::InvalidSetting {
                        key: "styles",
                        reason: format!("unknown style `{unknown}`"),
                    });
                }
                if styles.is_empty() {
                    styles = DEFAULT_STYLES.map(String::from).to_vec();
                }

                Ok(FontAwesome::Cdn {
                    version: version.into(),
                    license,
                    styles,
                })
            }
            other => Err(ValidationError::InvalidSetting {
                key: "mode",
                reason: format!("`{other}` is neither `cdn` nor `kit`"),
            }),
        }
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let FontAwesome::Cdn {
            version,
            license,
            styles,
        } = self
        else {
            return Ok(Vec::new());
        };

        let major = major_version(version);
        let path = env
            .definitions_path
            .join("font-awesome")
            .join(format!("{major}-{license}.json"));
        let definitions: BTreeMap<String, Definition> = read_json(&path)?;

        let mut icons = Vec::new();
        for (name, definition) in &definitions {
            // selected styles drive the order, the definition decides availability
            for style in styles.iter().filter(|s| definition.styles.contains(*s)) {
                let class = format!("{} fa-{name}", style_class(major, style));
                let mut icon = Icon::new(IconType::Font, &format!("{name}-{style}"), &class);
                icon.label = definition
                    .label
                    .clone()
                    .unwrap_or_else(|| title_case(name));
                icon.keywords.insert(name.clone());
                icon.keywords.extend(definition.search.terms.iter().cloned());
                icon.metadata.insert(meta::STYLE.into(), style.as_str().into());
                if let Some(unicode) = &definition.unicode {
                    icon.metadata.insert(meta::UNICODE.into(), unicode.as_str().into());
                }
                icons.push(icon);
            }
        }

        Ok(icons)
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        match self {
            FontAwesome::Cdn {
                version,
                license: FontAwesomeLicense::Free,
                ..
            } => vec![Asset::Stylesheet {
                href: format!("https://use.fontawesome.com/releases/v{version}/css/all.css"),
            }],
            FontAwesome::Cdn {
                version,
                license: FontAwesomeLicense::Pro,
                ..
            } => vec![Asset::Stylesheet {
                href: format!("https://pro.fontawesome.com/releases/v{version}/css/all.css"),
            }],
            FontAwesome::Kit { kit_code } => vec![Asset::Script {
                src: format!("https://kit.fontawesome.com/{kit_code}.js"),
            }],
        }
    }
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Version 5 uses the short `fas`/`far`/... prefixes, later versions spell the style out.
fn style_class(major: &str, style: &str) -> String {
    if major == "5" {
        let short = match style {
            "solid" => "fas",
            "regular" => "far",
            "light" => "fal",
            "thin" => "fat",
            "duotone" => "fad",
            _ => "fab",
        };
        short.to_string()
    } else {
        format!("fa-{style}")
    }
}

#[cfg(test)]
mod test {
    use crate::assets::Asset;
    use crate::error::ValidationError;
    use crate::icon::meta;
    use crate::icon_set::{IconSet, IconSetType};
    use crate::source::{FontAwesome, Source, SourceEnv};
    use serde_json::json;
    use std::error::Error;
    use std::fs;
    use tempfile::TempDir;

    static DEFINITIONS: &str = include_str!("../../resources/font-awesome-6-free.json");

    fn setup() -> Result<(TempDir, SourceEnv), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let defs = dir.path().join("definitions/font-awesome");
        fs::create_dir_all(&defs)?;
        fs::write(defs.join("6-free.json"), DEFINITIONS)?;
        let env = SourceEnv {
            icon_sets_path: dir.path().join("icons"),
            definitions_path: dir.path().join("definitions"),
        };
        Ok((dir, env))
    }

    #[test]
    fn test_cdn_fans_out_styles() -> Result<(), Box<dyn Error>> {
        let (_dir, env) = setup()?;
        let set = IconSet::new("fa", "Font Awesome", IconSetType::FontAwesome)
            .with_setting("version", "6.5.2")
            .with_setting("styles", json!(["solid", "regular"]));

        let icons = Source::from_set(&set)?.resolve(&env);

        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        // github is brands-only and brands was not selected
        assert_eq!(names, vec!["heart-regular", "heart-solid", "house-solid"]);

        let house = &icons[2];
        assert_eq!(house.value, "fa-solid fa-house");
        assert_eq!(house.label, "House");
        assert!(house.keywords.contains("home"));
        assert_eq!(house.meta_str(meta::STYLE), Some("solid"));
        assert_eq!(house.meta_str(meta::UNICODE), Some("f015"));

        Ok(())
    }

    #[test]
    fn test_cdn_default_styles_and_assets() -> Result<(), Box<dyn Error>> {
        let (_dir, env) = setup()?;
        let set = IconSet::new("fa", "Font Awesome", IconSetType::FontAwesome);

        let source = Source::from_set(&set)?;
        let icons = source.resolve(&env);

        assert!(icons.iter().any(|i| i.name == "github-brands" && i.value == "fa-brands fa-github"));
        assert_eq!(
            source.assets(),
            vec![Asset::Stylesheet {
                href: "https://use.fontawesome.com/releases/v6.5.2/css/all.css".into()
            }]
        );

        Ok(())
    }

    #[test]
    fn test_kit_enumerates_nothing() -> Result<(), Box<dyn Error>> {
        let (_dir, env) = setup()?;
        let set = IconSet::new("fa", "Font Awesome", IconSetType::FontAwesome)
            .with_setting("mode", "kit")
            .with_setting("kit_code", "abc123");

        let source = Source::from_set(&set)?;
        assert!(source.resolve(&env).is_empty());
        assert_eq!(
            source.assets(),
            vec![Asset::Script {
                src: "https://kit.fontawesome.com/abc123.js".into()
            }]
        );

        Ok(())
    }

    #[test]
    fn test_settings_validation() {
        let kit = IconSet::new("fa", "FA", IconSetType::FontAwesome).with_setting("mode", "kit");
        assert_eq!(
            FontAwesome::from_settings(&kit.settings),
            Err(ValidationError::MissingSetting("kit_code"))
        );

        let bad_style = IconSet::new("fa", "FA", IconSetType::FontAwesome)
            .with_setting("styles", "solid, shiny");
        assert!(matches!(
            FontAwesome::from_settings(&bad_style.settings),
            Err(ValidationError::InvalidSetting { key: "styles", .. })
        ));

        let bad_version = IconSet::new("fa", "FA", IconSetType::FontAwesome)
            .with_setting("version", "latest");
        assert!(matches!(
            FontAwesome::from_settings(&bad_version.settings),
            Err(ValidationError::InvalidSetting { key: "version", .. })
        ));
    }

    #[test]
    fn test_version_five_prefixes() -> Result<(), Box<dyn Error>> {
        let (dir, env) = setup()?;
        fs::write(
            dir.path().join("definitions/font-awesome/5-free.json"),
            DEFINITIONS,
        )?;
        let set = IconSet::new("fa", "FA", IconSetType::FontAwesome)
            .with_setting("version", "5.15.4")
            .with_setting("styles", "regular");

        let icons = Source::from_set(&set)?.resolve(&env);
        assert_eq!(icons.len(), 1);
        assert_eq!(icons[0].value, "far fa-heart");

        Ok(())
    }
}
