//! Sanitizing and decorating inline SVG markup.
//!
//! Everything that leaves this module as inline markup has gone through [sanitize] first: script
//! elements and their content, `on*` handlers and script-bearing URLs are dropped. A document that
//! does not parse, or has nothing left after sanitizing, yields `None`.

use crate::render::RenderOptions;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Elements that are removed along with everything inside them.
const BLOCKED_ELEMENTS: [&str; 5] = ["script", "foreignobject", "iframe", "embed", "object"];

/// `data:` URLs that cannot carry script.
const SAFE_DATA_PREFIXES: [&str; 5] = [
    "data:image/png",
    "data:image/jpeg",
    "data:image/jpg",
    "data:image/gif",
    "data:image/webp",
];

pub fn sanitize(svg: &str) -> Option<String> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::new());
    let mut blocked_depth = 0usize;
    let mut has_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::debug!("rejecting svg that failed to parse: {_e}");
                return None;
            }
        };

        match event {
            Event::Eof => break,
            Event::Start(start) => {
                if blocked_depth > 0 || is_blocked(&start) {
                    blocked_depth += 1;
                    continue;
                }
                has_root |= is_svg_root(&start);
                writer.write_event(Event::Start(clean_element(&start)?)).ok()?;
            }
            Event::Empty(empty) => {
                if blocked_depth > 0 || is_blocked(&empty) {
                    continue;
                }
                has_root |= is_svg_root(&empty);
                writer.write_event(Event::Empty(clean_element(&empty)?)).ok()?;
            }
            Event::End(end) => {
                if blocked_depth > 0 {
                    blocked_depth -= 1;
                    continue;
                }
                writer.write_event(Event::End(end)).ok()?;
            }
            // doctypes can declare entities; declarations and processing instructions have no
            // place in inline markup
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) => continue,
            other => {
                if blocked_depth == 0 {
                    writer.write_event(other).ok()?;
                }
            }
        }
    }

    let output = String::from_utf8(writer.into_inner()).ok()?;
    (has_root && !output.trim().is_empty()).then_some(output)
}

/// Applies the requested class, attributes and dimensions to the root `<svg>` element.
///
/// Expects sanitized markup.
pub fn decorate(svg: &str, options: &RenderOptions) -> Option<String> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::new());
    let mut root_done = false;

    loop {
        match reader.read_event().ok()? {
            Event::Eof => break,
            Event::Start(start) if !root_done && is_svg_root(&start) => {
                root_done = true;
                writer.write_event(Event::Start(decorate_root(&start, options)?)).ok()?;
            }
            Event::Empty(empty) if !root_done && is_svg_root(&empty) => {
                root_done = true;
                writer.write_event(Event::Empty(decorate_root(&empty, options)?)).ok()?;
            }
            other => writer.write_event(other).ok()?,
        }
    }

    String::from_utf8(writer.into_inner()).ok()
}

fn is_blocked(element: &BytesStart) -> bool {
    let name = String::from_utf8_lossy(element.local_name().as_ref()).to_ascii_lowercase();
    BLOCKED_ELEMENTS.contains(&name.as_str())
}

fn is_svg_root(element: &BytesStart) -> bool {
    element.local_name().as_ref().eq_ignore_ascii_case(b"svg")
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn clean_element(element: &BytesStart) -> Option<BytesStart<'static>> {
    let mut clean = BytesStart::new(element_name(element));
    for attr in element.attributes() {
        let attr = attr.ok()?;
        if is_safe_attribute(&attr) {
            clean.push_attribute(attr);
        }
    }
    Some(clean)
}

fn is_safe_attribute(attr: &Attribute) -> bool {
    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
    if key.starts_with("on") {
        return false;
    }
    // entities we cannot resolve might be hiding a scheme
    let Ok(value) = attr.unescape_value() else {
        return false;
    };
    is_safe_value(&key, &value)
}

/// Caller-supplied attribute names: a single plain name, never an event handler.
pub(crate) fn is_safe_attr_name(key: &str) -> bool {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    plain && !key.to_ascii_lowercase().starts_with("on")
}

pub(crate) fn is_safe_value(key: &str, value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if normalized.contains("javascript:") || normalized.contains("vbscript:") {
        return false;
    }
    if key == "style" && normalized.contains("expression(") {
        return false;
    }

    // a data url starts the value or follows `url(` / a quote
    let data_urls = normalized
        .match_indices("data:")
        .filter(|(idx, _)| *idx == 0 || matches!(normalized.as_bytes()[idx - 1], b'(' | b'"' | b'\''))
        .map(|(idx, _)| &normalized[idx..]);
    for url in data_urls {
        if !SAFE_DATA_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
            return false;
        }
    }

    true
}

fn decorate_root(root: &BytesStart, options: &RenderOptions) -> Option<BytesStart<'static>> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in root.attributes() {
        let attr = attr.ok()?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().ok()?.into_owned();
        attrs.push((key, value));
    }

    let get = |attrs: &[(String, String)], key: &str| {
        attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    };
    let original = intrinsic_size(
        get(&attrs, "width").as_deref(),
        get(&attrs, "height").as_deref(),
        get(&attrs, "viewBox").as_deref(),
    );
    let (width, height) = scaled_size(original, options);

    if let Some(class) = options.class.as_deref().filter(|c| !c.is_empty()) {
        let merged = match get(&attrs, "class").filter(|c| !c.is_empty()) {
            Some(existing) => format!("{existing} {class}"),
            None => class.to_string(),
        };
        set_attr(&mut attrs, "class", merged);
    }
    if let Some(width) = width {
        set_attr(&mut attrs, "width", format_number(width));
    }
    if let Some(height) = height {
        set_attr(&mut attrs, "height", format_number(height));
    }
    for (key, value) in &options.attrs {
        if is_safe_attr_name(key) && is_safe_value(&key.to_ascii_lowercase(), value) {
            set_attr(&mut attrs, key, value.clone());
        }
    }

    let mut decorated = BytesStart::new(element_name(root));
    for (key, value) in &attrs {
        decorated.push_attribute((key.as_str(), value.as_str()));
    }
    Some(decorated)
}

fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => attrs.push((key.to_string(), value)),
    }
}

/// The document's own size: `width`/`height` when both are plain lengths, the viewBox otherwise.
fn intrinsic_size(
    width: Option<&str>,
    height: Option<&str>,
    view_box: Option<&str>,
) -> Option<(f64, f64)> {
    if let (Some(w), Some(h)) = (width.and_then(parse_length), height.and_then(parse_length)) {
        return Some((w, h));
    }

    let parts = view_box?
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    value.parse::<f64>().ok().filter(|v| *v > 0.0)
}

/// `size` forces a square; a lone `width` or `height` keeps the original aspect ratio.
pub(crate) fn scaled_size(
    original: Option<(f64, f64)>,
    options: &RenderOptions,
) -> (Option<f64>, Option<f64>) {
    if let Some(size) = options.size {
        let size = f64::from(size);
        return (Some(size), Some(size));
    }

    let width = options.width.map(f64::from);
    let height = options.height.map(f64::from);
    match (width, height, original) {
        (Some(w), Some(h), _) => (Some(w), Some(h)),
        (Some(w), None, Some((ow, oh))) => (Some(w), Some(round(w * oh / ow))),
        (None, Some(h), Some((ow, oh))) => (Some(round(h * ow / oh)), Some(h)),
        (w, h, _) => (w, h),
    }
}

fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
