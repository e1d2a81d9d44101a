use crate::assets::Asset;
use crate::error::{AdapterError, ValidationError};
use crate::icon::{Icon, IconType, meta};
use crate::icon_set::SetSettings;
use crate::source::{SourceEnv, portable, relative_path};
use std::path::PathBuf;

/// Codepoints below this are control characters and space.
const FIRST_PRINTABLE: u32 = 33;

/// A font binary (ttf/otf/woff2-decoded) whose glyphs are rendered by codepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct WebFont {
    pub font_file: PathBuf,
    /// Base CSS class and font family name.
    pub css_prefix: String,
}

impl WebFont {
    pub fn from_settings(settings: &SetSettings) -> Result<Self, ValidationError> {
        let font_file = relative_path("font_file", settings.required_str("font_file")?)?;

        Ok(WebFont {
            font_file,
            css_prefix: settings.str("css_prefix").unwrap_or("icon").into(),
        })
    }

    pub(crate) fn scan(&self, env: &SourceEnv) -> Result<Vec<Icon>, AdapterError> {
        let path = env.icon_sets_path.join(&self.font_file);
        if !path.is_file() {
            return Err(AdapterError::NotFound(path));
        }
        let data = std::fs::read(&path)?;
        let face = ttf_parser::Face::parse(&data, 0)?;

        let mut glyphs = Vec::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|s| s.is_unicode()) {
                subtable.codepoints(|codepoint| {
                    // glyph 0 is .notdef, the "missing glyph"
                    if let Some(glyph) = subtable.glyph_index(codepoint).filter(|g| g.0 != 0) {
                        glyphs.push((codepoint, glyph));
                    }
                });
            }
        }
        glyphs.sort_by_key(|(codepoint, _)| *codepoint);
        glyphs.dedup_by_key(|(codepoint, _)| *codepoint);

        let icons = glyphs
            .into_iter()
            .filter(|(codepoint, _)| *codepoint >= FIRST_PRINTABLE)
            .map(|(codepoint, glyph)| {
                let name = face
                    .glyph_name(glyph)
                    .filter(|n| !n.is_empty() && *n != ".notdef")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("glyph-{codepoint:x}"));

                let class = format!("{prefix} {prefix}-{name}", prefix = self.css_prefix);
                let mut icon = Icon::new(IconType::Font, &name, &class);
                icon.metadata
                    .insert(meta::UNICODE.into(), format!("{codepoint:x}").into());
                icon.metadata
                    .insert(meta::FONT_FAMILY.into(), self.css_prefix.clone().into());
                icon
            })
            .collect();

        Ok(icons)
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        vec![Asset::FontFace {
            family: self.css_prefix.clone(),
            src: portable(&self.font_file),
        }]
    }
}

#[cfg(test)]
mod test {
    use crate::assets::Asset;
    use crate::icon::meta;
    use crate::icon_set::{IconSet, IconSetType};
    use crate::source::{Source, SourceEnv};
    use std::error::Error;
    use std::fs;
    use tempfile::TempDir;

    /// Glyphs: space (U+0020, "space"), U+E001 "star", U+E002 unnamed.
    static FONT: &[u8] = include_bytes!("../../resources/glyphs.ttf");

    #[test]
    fn test_scan_font() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("fonts"))?;
        fs::write(dir.path().join("fonts/glyphs.ttf"), FONT)?;
        let env = SourceEnv {
            icon_sets_path: dir.path().to_owned(),
            definitions_path: dir.path().join("definitions"),
        };

        let set = IconSet::new("glyphs", "Glyphs", IconSetType::WebFont)
            .with_setting("font_file", "fonts/glyphs.ttf")
            .with_setting("css_prefix", "gl");
        let source = Source::from_set(&set)?;
        let icons = source.resolve(&env);

        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["glyph-e002", "star"]);

        let star = &icons[1];
        assert_eq!(star.value, "gl gl-star");
        assert_eq!(star.meta_str(meta::UNICODE), Some("e001"));
        assert_eq!(star.meta_str(meta::FONT_FAMILY), Some("gl"));

        assert_eq!(
            source.assets(),
            vec![Asset::FontFace {
                family: "gl".into(),
                src: "fonts/glyphs.ttf".into()
            }]
        );

        Ok(())
    }

    #[test]
    fn test_not_a_font() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("broken.ttf"), b"definitely not a font")?;
        let env = SourceEnv {
            icon_sets_path: dir.path().to_owned(),
            definitions_path: dir.path().join("definitions"),
        };

        let set = IconSet::new("glyphs", "Glyphs", IconSetType::WebFont)
            .with_setting("font_file", "broken.ttf");
        assert!(Source::from_set(&set)?.resolve(&env).is_empty());

        Ok(())
    }
}
