use crate::error::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub type SetId = u64;

static HANDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("handle pattern is a valid regex")
});

/// A named, configured source of icons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconSet {
    /// Assigned by storage on first save.
    pub id: Option<SetId>,
    pub handle: String,
    pub name: String,
    #[serde(rename = "type")]
    pub set_type: IconSetType,
    pub settings: SetSettings,
    pub enabled: bool,
    pub sort_order: i32,
    /// Set when the settings were saved but the catalog could not be refreshed afterwards.
    #[serde(default)]
    pub needs_refresh: bool,
}

impl IconSet {
    pub fn new(handle: &str, name: &str, set_type: IconSetType) -> Self {
        IconSet {
            id: None,
            handle: handle.into(),
            name: name.into(),
            set_type,
            settings: SetSettings::default(),
            enabled: true,
            sort_order: 0,
            needs_refresh: false,
        }
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Checks the fields every set needs, independent of its type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.handle.is_empty() {
            return Err(ValidationError::MissingField("handle"));
        }
        if !HANDLE_PATTERN.is_match(&self.handle) {
            return Err(ValidationError::InvalidHandle(self.handle.clone()));
        }

        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconSetType {
    SvgFolder,
    SvgSprite,
    FontAwesome,
    MaterialIcons,
    WebFont,
    Custom,
}

impl IconSetType {
    pub const ALL: [IconSetType; 6] = [
        IconSetType::SvgFolder,
        IconSetType::SvgSprite,
        IconSetType::FontAwesome,
        IconSetType::MaterialIcons,
        IconSetType::WebFont,
        IconSetType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IconSetType::SvgFolder => "svg-folder",
            IconSetType::SvgSprite => "svg-sprite",
            IconSetType::FontAwesome => "font-awesome",
            IconSetType::MaterialIcons => "material-icons",
            IconSetType::WebFont => "web-font",
            IconSetType::Custom => "custom",
        }
    }
}

impl fmt::Display for IconSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IconSetType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        IconSetType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownType(value.into()))
    }
}

/// Type-specific key/value settings of an icon set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetSettings(BTreeMap<String, Value>);

impl SetSettings {
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// A non-empty, trimmed string setting.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn required_str(&self, key: &'static str) -> Result<&str, ValidationError> {
        self.str(key).ok_or(ValidationError::MissingSetting(key))
    }

    /// Accepts real booleans as well as the `"1"`/`"true"` strings form posts produce.
    pub fn bool(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "on" | "yes"),
            Some(Value::Number(n)) => n.as_u64().is_some_and(|n| n != 0),
            _ => false,
        }
    }

    /// A list setting; a comma-separated string is accepted too.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::ValidationError;
    use crate::icon_set::{IconSet, IconSetType};
    use serde_json::json;

    #[test]
    fn test_handle_pattern() {
        let ok = IconSet::new("brand_icons2", "Brand", IconSetType::SvgFolder);
        assert_eq!(ok.validate(), Ok(()));

        for bad in ["2icons", "_icons", "brand-icons", "brand icons"] {
            let set = IconSet::new(bad, "Brand", IconSetType::SvgFolder);
            assert_eq!(set.validate(), Err(ValidationError::InvalidHandle(bad.into())));
        }

        let missing = IconSet::new("", "Brand", IconSetType::SvgFolder);
        assert_eq!(missing.validate(), Err(ValidationError::MissingField("handle")));
        let unnamed = IconSet::new("brand", " ", IconSetType::SvgFolder);
        assert_eq!(unnamed.validate(), Err(ValidationError::MissingField("name")));
    }

    #[test]
    fn test_type_names_round_trip() {
        for ty in IconSetType::ALL {
            assert_eq!(ty.as_str().parse::<IconSetType>(), Ok(ty));
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(ty.as_str()));
        }
        assert_eq!(
            "png-folder".parse::<IconSetType>(),
            Err(ValidationError::UnknownType("png-folder".into()))
        );
    }

    #[test]
    fn test_settings_accessors() {
        let set = IconSet::new("fa", "Font Awesome", IconSetType::FontAwesome)
            .with_setting("styles", json!(["solid", " regular ", ""]))
            .with_setting("other_styles", "light, thin")
            .with_setting("recurse", "1")
            .with_setting("version", "  ");

        assert_eq!(set.settings.list("styles"), vec!["solid", "regular"]);
        assert_eq!(set.settings.list("other_styles"), vec!["light", "thin"]);
        assert!(set.settings.bool("recurse"));
        assert!(!set.settings.bool("missing"));
        assert_eq!(set.settings.str("version"), None);
        assert_eq!(
            set.settings.required_str("version"),
            Err(ValidationError::MissingSetting("version"))
        );
    }
}
