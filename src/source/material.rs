use crate::assets::Asset;
use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType, meta, title_case};
use crate::icon_set::SetSettings;
use crate::source::{SourceEnv, read_json};
use serde::Deserialize;

/// Google's Material icon fonts, either the variable "symbols" font or the classic static fonts.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialIcons {
    /// One icon per definition, all drawn with the same variable font.
    Symbols { style: SymbolStyle },
    /// One icon per definition and selected style the definition is available in.
    Classic { styles: Vec<ClassicStyle> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolStyle {
    Outlined,
    Rounded,
    Sharp,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClassicStyle {
    Filled,
    Outlined,
    Round,
    Sharp,
    TwoTone,
}

impl SymbolStyle {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "outlined" => Some(SymbolStyle::Outlined),
            "rounded" => Some(SymbolStyle::Rounded),
            "sharp" => Some(SymbolStyle::Sharp),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            SymbolStyle::Outlined => "Outlined",
            SymbolStyle::Rounded => "Rounded",
            SymbolStyle::Sharp => "Sharp",
        }
    }

    fn family(self) -> String {
        format!("Material Symbols {}", self.suffix())
    }

    fn class(self) -> String {
        format!("material-symbols-{}", self.suffix().to_lowercase())
    }
}

impl ClassicStyle {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "filled" => Some(ClassicStyle::Filled),
            "outlined" => Some(ClassicStyle::Outlined),
            "round" => Some(ClassicStyle::Round),
            "sharp" => Some(ClassicStyle::Sharp),
            "two-tone" => Some(ClassicStyle::TwoTone),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ClassicStyle::Filled => "filled",
            ClassicStyle::Outlined => "outlined",
            ClassicStyle::Round => "round",
            ClassicStyle::Sharp => "sharp",
            ClassicStyle::TwoTone => "two-tone",
        }
    }

    fn family(self) -> &'static str {
        match self {
            ClassicStyle::Filled => "Material Icons",
            ClassicStyle::Outlined => "Material Icons Outlined",
            ClassicStyle::Round => "Material Icons Round",
            ClassicStyle::Sharp => "Material Icons Sharp",
            ClassicStyle::TwoTone => "Material Icons Two Tone",
        }
    }

    fn class(self) -> String {
        match self {
            ClassicStyle::Filled => "material-icons".into(),
            other => format!("material-icons-{}", other.name()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Definitions {
    icons: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    name: String,
    codepoint: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    unsupported_families: Vec<String>,
}

impl Definition {
    fn supports(&self, family: &str) -> bool {
        !self.unsupported_families.iter().any(|f| f == family)
    }

    fn icon(&self, name: &str, class: String, style: &str) -> Icon {
        let mut icon = Icon::new(IconType::Font, name, &class);
        icon.label = title_case(&self.name);
        icon.keywords.extend(self.tags.iter().cloned());
        icon.metadata
            .insert(meta::LIGATURE.into(), self.name.as_str().into());
        icon.metadata.insert(meta::STYLE.into(), style.into());
        if let Some(codepoint) = &self.codepoint {
            icon.metadata
                .insert(meta::UNICODE.into(), codepoint.as_str().into());
        }
        icon
    }
}

impl MaterialIcons {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        match settings.str("mode").unwrap_or("symbols") {
            "symbols" => {
                let value = settings.str("style").unwrap_or("outlined");
                let style = SymbolStyle::parse(value).ok_or_else(|| {
                    ValidationError::InvalidSetting {
                        key: "style",
                        reason: format!("unknown symbols style `{value}`"),
                    }
                })?;
                Ok(MaterialIcons::Symbols { style })
            }
            "classic" => {
                let mut styles = settings
                    .list("styles")
                    .iter()
                    .map(|value| {
                        ClassicStyle::parse(value).ok_or_else(|| ValidationError::InvalidSetting {
                            key: "styles",
                            reason: format!("unknown classic style `{value}`"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if styles.is_empty() {
                    styles.push(ClassicStyle::Filled);
                }
                Ok(MaterialIcons::Classic { styles })
            }
            other => Err(ValidationError::InvalidSetting {
                key: "mode",
                reason: format!("`{other}` is neither `symbols` nor `classic`"),
            }),
        }
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let path = env.definitions_path.join("material-icons").join("icons.json");
        let definitions: Definitions = read_json(&path)?;

        let mut icons = Vec::new();
        match self {
            MaterialIcons::Symbols { style } => {
                let family = style.family();
                for definition in definitions.icons.iter().filter(|d| d.supports(&family)) {
                    let name = style.suffix().to_lowercase();
                    icons.push(definition.icon(&definition.name, style.class(), &name));
                }
            }
            MaterialIcons::Classic { styles } => {
                for definition in &definitions.icons {
                    for style in styles.iter().filter(|s| definition.supports(s.family())) {
                        let name = format!("{}-{}", definition.name, style.name());
                        icons.push(definition.icon(&name, style.class(), style.name()));
                    }
                }
            }
        }

        Ok(icons)
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        match self {
            MaterialIcons::Symbols { style } => vec![Asset::Stylesheet {
                href: format!(
                    "https://fonts.googleapis.com/css2?family={}",
                    style.family().replace(' ', "+")
                ),
            }],
            MaterialIcons::Classic { styles } => styles
                .iter()
                .map(|style| Asset::Stylesheet {
                    href: format!(
                        "https://fonts.googleapis.com/icon?family={}",
                        style.family().replace(' ', "+")
                    ),
                })
                .collect(),
        }
    }
}
