use crate::icon_set::SetId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Keys of [Icon::metadata] the renderers understand.
pub mod meta {
    /// Hex codepoint of a font glyph, e.g. `"e001"`.
    pub const UNICODE: &str = "unicode";
    /// Text rendered inside a ligature font element.
    pub const LIGATURE: &str = "ligature";
    /// Style variant the icon was fanned out for.
    pub const STYLE: &str = "style";
    /// Font family a unicode glyph is drawn with.
    pub const FONT_FAMILY: &str = "font_family";
}

/// One materialized icon inside a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub icon_set_id: SetId,
    pub icon_set_handle: String,
    #[serde(rename = "type")]
    pub icon_type: IconType,
    /// Unique within the set.
    pub name: String,
    pub label: String,
    /// svg: path relative to the icon sets base directory. sprite: symbol id. font: css class.
    pub value: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Attached by the consumer when the icon is bound to a field value.
    #[serde(skip)]
    pub custom_label: Option<String>,
    /// Per-site custom labels, keyed by site handle.
    #[serde(skip)]
    pub custom_labels: BTreeMap<String, String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    Svg,
    Sprite,
    Font,
}

/// Everything label resolution depends on besides the icon itself.
#[derive(Clone, Copy)]
pub struct LabelContext<'a> {
    /// Language of the current site, e.g. `de-CH`.
    pub language: &'a str,
    pub site: Option<&'a str>,
    /// Base directory svg values are relative to; sidecar labels are skipped without it.
    pub icon_sets_path: Option<&'a Path>,
    pub translations: Option<&'a dyn Translations>,
}

impl<'a> LabelContext<'a> {
    pub fn new(language: &'a str) -> Self {
        LabelContext {
            language,
            site: None,
            icon_sets_path: None,
            translations: None,
        }
    }
}

pub trait Translations {
    fn translate(&self, key: &str, language: &str) -> Option<String>;
}

/// Translations keyed by language, then message key.
#[derive(Debug, Default, Clone)]
pub struct TranslationTable {
    messages: BTreeMap<String, BTreeMap<String, String>>,
}

impl TranslationTable {
    pub fn insert(&mut self, language: &str, key: &str, message: &str) {
        self.messages
            .entry(language.into())
            .or_default()
            .insert(key.into(), message.into());
    }
}

impl Translations for TranslationTable {
    fn translate(&self, key: &str, language: &str) -> Option<String> {
        language_keys(language)
            .iter()
            .find_map(|lang| self.messages.get(lang)?.get(key))
            .cloned()
    }
}

#[derive(Deserialize)]
struct Sidecar {
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl Icon {
    pub fn new(icon_type: IconType, name: &str, value: &str) -> Self {
        Icon {
            icon_set_id: 0,
            icon_set_handle: String::new(),
            icon_type,
            name: name.into(),
            label: title_case(name),
            value: value.into(),
            keywords: BTreeSet::new(),
            metadata: BTreeMap::new(),
            custom_label: None,
            custom_labels: BTreeMap::new(),
        }
    }

    /// Stable key of a materialized icon: its set and name.
    pub fn id(&self) -> String {
        format!("{}:{}", self.icon_set_id, self.name)
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Absolute path of an svg icon's file.
    pub fn path(&self, icon_sets_path: &Path) -> Option<PathBuf> {
        (self.icon_type == IconType::Svg).then(|| icon_sets_path.join(&self.value))
    }

    /// Resolves the label to show, most specific source first.
    pub fn display_label(&self, context: &LabelContext) -> String {
        if let Some(label) = context
            .site
            .and_then(|site| self.custom_labels.get(site))
            .filter(|l| !l.is_empty())
        {
            return label.clone();
        }
        if let Some(label) = self.custom_label.as_ref().filter(|l| !l.is_empty()) {
            return label.clone();
        }
        if let Some(label) = context
            .icon_sets_path
            .and_then(|base| self.sidecar_label(base, context.language))
        {
            return label;
        }
        if !self.label.is_empty() {
            return self.label.clone();
        }
        if let Some(label) = context
            .translations
            .and_then(|t| t.translate(&self.name, context.language))
        {
            return label;
        }

        title_case(&self.name)
    }

    fn sidecar_label(&self, icon_sets_path: &Path, language: &str) -> Option<String> {
        let path = self.path(icon_sets_path)?.with_extension("json");
        let bytes = std::fs::read(path).ok()?;
        let sidecar: Sidecar = serde_json::from_slice(&bytes).ok()?;

        language_keys(language)
            .iter()
            .find_map(|key| sidecar.labels.get(key))
            .filter(|label| !label.is_empty())
            .cloned()
    }

    /// Whether the icon can still be rendered.
    pub fn exists(&self, icon_sets_path: &Path) -> bool {
        match self.icon_type {
            IconType::Font => !self.metadata.is_empty() || !self.name.is_empty(),
            IconType::Sprite => !self.value.is_empty(),
            IconType::Svg => self.path(icon_sets_path).is_some_and(|p| p.is_file()),
        }
    }

    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.label.to_lowercase().contains(needle)
            || self.keywords.iter().any(|k| k.to_lowercase().contains(needle))
    }
}

/// `de-CH` is looked up as `de-CH`, then `de`, then the legacy capitalized `De`.
fn language_keys(language: &str) -> Vec<String> {
    let mut keys = vec![language.to_string()];
    if let Some(primary) = language.split(['-', '_']).next().filter(|p| *p != language) {
        keys.push(primary.to_string());
    }
    let primary = keys.last().cloned().unwrap_or_default();
    let mut chars = primary.chars();
    if let Some(first) = chars.next() {
        keys.push(first.to_uppercase().chain(chars).collect());
    }
    keys.dedup();
    keys
}

/// `arrow-left` -> `Arrow Left`
pub(crate) fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
