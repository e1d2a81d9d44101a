use serde::Serialize;
use std::collections::HashSet;

/// A resource a page must load before icons of some set display.
///
/// Remote resources carry absolute URLs. Local ones carry paths relative to the icon sets
/// directory; the host decides which URL serves them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Asset {
    Stylesheet { href: String },
    Script { src: String },
    FontFace { family: String, src: String },
    /// A sprite document, injected once per page.
    Sprite { path: String },
}

impl Asset {
    pub fn is_remote(&self) -> bool {
        let location = match self {
            Asset::Stylesheet { href } => href,
            Asset::Script { src } | Asset::FontFace { src, .. } => src,
            Asset::Sprite { path } => path,
        };
        location.starts_with("https://") || location.starts_with("http://")
    }
}

/// Drops repeated assets, keeping the first occurrence of each.
pub fn dedupe<I>(assets: I) -> Vec<Asset>
where
    I: IntoIterator<Item = Asset>,
{
    let mut seen = HashSet::new();
    assets
        .into_iter()
        .filter(|asset| seen.insert(asset.clone()))
        .collect()
}

#[cfg(test)]
mod test {
    use crate::assets::{Asset, dedupe};

    #[test]
    fn test_dedupe_keeps_order() {
        let css = Asset::Stylesheet {
            href: "https://example.com/all.css".into(),
        };
        let sprite = Asset::Sprite {
            path: "sprites/ui.svg".into(),
        };

        let assets = dedupe([css.clone(), sprite.clone(), css.clone()]);

        assert_eq!(assets, vec![css.clone(), sprite.clone()]);
        assert!(css.is_remote());
        assert!(!sprite.is_remote());
    }
}
