use crate::assets::Asset;
use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType, meta};
use crate::icon_set::SetSettings;
use crate::source::{SourceEnv, portable, relative_path};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{([^}]*)\}").expect("rule pattern is a valid regex"));
static CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"content\s*:\s*["']\\([0-9A-Fa-f]{1,6})["']"#)
        .expect("content pattern is a valid regex")
});
static BEFORE_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.([A-Za-z0-9_-]+)::?before$").expect("selector pattern is a valid regex")
});

/// An icon font described by a stylesheet of `.<prefix><name>::before { content }` rules.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFont {
    pub css_file: PathBuf,
    pub css_prefix: String,
}

impl CustomFont {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        Ok(CustomFont {
            css_file: relative_path("css_file", settings.required_str("css_file")?)?,
            css_prefix: settings.required_str("css_prefix")?.into(),
        })
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let path = env.icon_sets_path.join(&self.css_file);
        if !path.is_file() {
            return Err(AdapterError::NotFound(path));
        }
        let css = std::fs::read_to_string(&path)?;

        let mut icons = Vec::new();
        for rule in RULE.captures_iter(&css) {
            let Some(codepoint) = CONTENT.captures(&rule[2]).map(|c| c[1].to_lowercase()) else {
                continue;
            };

            for selector in rule[1].split(',').map(str::trim) {
                let Some(class) = BEFORE_SELECTOR.captures(selector).map(|c| c[1].to_string())
                else {
                    continue;
                };
                let Some(name) = class
                    .strip_prefix(self.css_prefix.as_str())
                    .map(|n| n.trim_start_matches('-'))
                    .filter(|n| !n.is_empty())
                else {
                    continue;
                };

                let mut icon = Icon::new(IconType::Font, name, &class);
                icon.metadata
                    .insert(meta::UNICODE.into(), codepoint.as_str().into());
                icons.push(icon);
            }
        }

        Ok(icons)
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        vec![Asset::Stylesheet {
            href: portable(&self.css_file),
        }]
    }
}
