use crate::assets::Asset;
use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType};
use crate::icon_set::SetSettings;
use crate::source::{SourceEnv, portable, read_json, relative_path};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single SVG document of `<symbol>`s, referenced with `<use href="#id">`.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgSprite {
    pub sprite_file: PathBuf,
    /// Stripped from symbol ids to form icon names.
    pub id_prefix: Option<String>,
    /// Optional JSON mapping symbol ids to keyword lists.
    pub metadata_file: Option<PathBuf>,
}

struct Symbol {
    id: String,
    title: Option<String>,
}

impl SvgSprite {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        let sprite_file = relative_path("sprite_file", settings.required_str("sprite_file")?)?;
        let metadata_file = settings
            .str("metadata_file")
            .map(|file| relative_path("metadata_file", file))
            .transpose()?;

        Ok(SvgSprite {
            sprite_file,
            id_prefix: settings.str("id_prefix").map(Into::into),
            metadata_file,
        })
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let path = env.icon_sets_path.join(&self.sprite_file);
        if !path.is_file() {
            return Err(AdapterError::NotFound(path));
        }
        let document = std::fs::read_to_string(&path)?;
        let symbols = parse_symbols(&document)?;

        let keywords: BTreeMap<String, Vec<String>> = match &self.metadata_file {
            Some(file) => read_json(&env.icon_sets_path.join(file)).unwrap_or_default(),
            None => BTreeMap::new(),
        };

        let icons = symbols
            .into_iter()
            .filter_map(|symbol| {
                let id = symbol.id.as_str();
                let name = match &self.id_prefix {
                    Some(prefix) => id.strip_prefix(prefix.as_str()).unwrap_or(id),
                    None => id,
                };
                if name.is_empty() {
                    return None;
                }

                let mut icon = Icon::new(IconType::Sprite, name, &symbol.id);
                if let Some(title) = symbol.title {
                    icon.label = title;
                }
                if let Some(words) = keywords.get(&symbol.id) {
                    icon.keywords.extend(words.iter().cloned());
                }
                Some(icon)
            })
            .collect();

        Ok(icons)
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        vec![Asset::Sprite {
            path: portable(&self.sprite_file),
        }]
    }
}

/// Every `<symbol id>` in document order, with the text of its `<title>` if it has one.
fn parse_symbols(document: &str) -> Result<Vec<Symbol>, AdapterError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut symbols = Vec::new();
    let mut symbol_depth = 0usize;
    let mut in_title = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(start) => {
                if symbol_depth > 0 {
                    symbol_depth += 1;
                    in_title = start.local_name().as_ref() == b"title";
                } else if let Some(id) = symbol_id(&start) {
                    symbols.push(Symbol { id, title: None });
                    symbol_depth = 1;
                }
            }
            Event::Empty(empty) => {
                if symbol_depth == 0 {
                    if let Some(id) = symbol_id(&empty) {
                        symbols.push(Symbol { id, title: None });
                    }
                }
            }
            Event::Text(text) if in_title => {
                let title = text.unescape()?.trim().to_string();
                if let Some(symbol) = symbols.last_mut().filter(|s| s.title.is_none()) {
                    symbol.title = Some(title).filter(|t| !t.is_empty());
                }
            }
            Event::End(_) => {
                in_title = false;
                symbol_depth = symbol_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    Ok(symbols)
}

fn symbol_id(element: &BytesStart) -> Option<String> {
    if element.local_name().as_ref() != b"symbol" {
        return None;
    }
    let id = element.try_get_attribute("id").ok()??;
    let id = id.unescape_value().ok()?.trim().to_string();
    (!id.is_empty()).then_some(id)
}
