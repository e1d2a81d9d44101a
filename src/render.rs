//! Turning icons into markup.
//!
//! Rendering never fails loudly: an icon whose source is gone, unreadable or empty renders as
//! `None`, so one broken icon cannot take a page down with it.

use crate::icon::{Icon, IconType, meta};
use crate::svg;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Font glyphs are drawn this much smaller than the requested size, to line up with SVGs.
const FONT_SIZE_OFFSET: u32 = 10;
const MIN_FONT_SIZE: u32 = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub class: Option<String>,
    /// Square size in pixels; wins over `width` and `height`.
    pub size: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Extra attributes for the outer element. Event handlers are never emitted.
    pub attrs: BTreeMap<String, String>,
}

impl RenderOptions {
    pub fn sized(size: u32) -> Self {
        RenderOptions {
            size: Some(size),
            ..Default::default()
        }
    }
}

/// State of one outgoing response: where svg files live and which icon sets the page used.
///
/// Create one per response and hand it to every [Icon::render] call, then ask the registry for
/// the assets of [RenderContext::used_sets].
#[derive(Debug, Clone)]
pub struct RenderContext {
    icon_sets_path: PathBuf,
    used_sets: Vec<String>,
}

impl RenderContext {
    pub fn new(icon_sets_path: impl Into<PathBuf>) -> Self {
        RenderContext {
            icon_sets_path: icon_sets_path.into(),
            used_sets: Vec::new(),
        }
    }

    pub fn icon_sets_path(&self) -> &Path {
        &self.icon_sets_path
    }

    /// Handles of the sets rendered from so far, in first-use order.
    pub fn used_sets(&self) -> &[String] {
        &self.used_sets
    }

    fn record(&mut self, handle: &str) {
        if !handle.is_empty() && !self.used_sets.iter().any(|h| h == handle) {
            self.used_sets.push(handle.to_string());
        }
    }
}

impl Icon {
    /// Sanitized markup of an svg icon's file.
    pub fn content(&self, icon_sets_path: &Path) -> Option<String> {
        let path = self.path(icon_sets_path)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::debug!("svg icon {path:?} unreadable: {_e}");

                return None;
            }
        };
        if raw.trim().is_empty() {
            return None;
        }
        svg::sanitize(&raw)
    }

    pub fn render(&self, options: &RenderOptions, context: &mut RenderContext) -> Option<String> {
        let markup = match self.icon_type {
            IconType::Svg => {
                let content = self.content(context.icon_sets_path())?;
                svg::decorate(&content, options)?
            }
            IconType::Font => self.render_font(options),
            IconType::Sprite => self.render_sprite(options)?,
        };

        context.record(&self.icon_set_handle);
        Some(markup)
    }

    fn render_font(&self, options: &RenderOptions) -> String {
        let mut classes = self.value.clone();
        if let Some(class) = options.class.as_deref().filter(|c| !c.is_empty()) {
            classes.push(' ');
            classes.push_str(class);
        }

        let mut style = String::new();
        let codepoint = self
            .meta_str(meta::UNICODE)
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        let family = self.meta_str(meta::FONT_FAMILY);
        if let Some(family) = family {
            let _ = write!(style, "font-family: '{family}';");
        }
        if let Some(size) = options.size {
            if !style.is_empty() {
                style.push(' ');
            }
            let _ = write!(style, "font-size: {}px;", font_size(size));
        }

        // unicode web fonts draw a codepoint, everything else is a class or a ligature
        let (tag, text) = match (family, codepoint) {
            (Some(_), Some(c)) => ("span", format!("&#x{:x};", u32::from(c))),
            _ => (
                "i",
                encode_text(self.meta_str(meta::LIGATURE).unwrap_or_default()).into_owned(),
            ),
        };

        let mut markup = format!("<{tag} class=\"{}\"", encode_double_quoted_attribute(&classes));
        if !style.is_empty() {
            let _ = write!(markup, " style=\"{}\"", encode_double_quoted_attribute(&style));
        }
        push_attrs(&mut markup, &options.attrs);
        let _ = write!(markup, " aria-hidden=\"true\">{text}</{tag}>");
        markup
    }

    fn render_sprite(&self, options: &RenderOptions) -> Option<String> {
        if self.value.is_empty() {
            return None;
        }

        let mut markup = String::from("<svg");
        if let Some(class) = options.class.as_deref().filter(|c| !c.is_empty()) {
            let _ = write!(markup, " class=\"{}\"", encode_double_quoted_attribute(class));
        }
        let (width, height) = match options.size {
            Some(size) => (Some(size), Some(size)),
            None => (options.width, options.height),
        };
        if let Some(width) = width {
            let _ = write!(markup, " width=\"{width}\"");
        }
        if let Some(height) = height {
            let _ = write!(markup, " height=\"{height}\"");
        }
        push_attrs(&mut markup, &options.attrs);
        let _ = write!(
            markup,
            " aria-hidden=\"true\"><use href=\"#{}\"></use></svg>",
            encode_double_quoted_attribute(&self.value)
        );
        Some(markup)
    }
}

fn font_size(requested: u32) -> u32 {
    requested.saturating_sub(FONT_SIZE_OFFSET).max(MIN_FONT_SIZE)
}

fn push_attrs(markup: &mut String, attrs: &BTreeMap<String, String>) {
    for (key, value) in attrs {
        if !svg::is_safe_attr_name(key) || !svg::is_safe_value(&key.to_ascii_lowercase(), value) {
            continue;
        }
        let _ = write!(markup, " {key}=\"{}\"", encode_double_quoted_attribute(value));
    }
}
