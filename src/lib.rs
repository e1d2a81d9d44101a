//! Icons for a website come from everywhere: folders of SVG files, sprite sheets, self-hosted
//! web fonts and icon-font services.
//!
//! This crate, `icon-catalog`, turns every one of those into the same thing: a list of [Icon]s
//! that can be searched, labelled, and rendered to safe markup, backed by persistent storage and
//! a two-tier cache.
//!
//! # Quick start
//!
//! ```no_run
//! use icon_catalog::{CatalogLookup, Config, IconSet, IconSetRegistry, IconSetType, MemoryStorage, RenderOptions};
//! use std::sync::Arc;
//!
//! let registry = IconSetRegistry::new(Config::default(), Arc::new(MemoryStorage::new()));
//! registry.save(IconSet::new("ui", "UI icons", IconSetType::SvgFolder).with_setting("folder", "ui"))?;
//!
//! let mut context = registry.render_context();
//! if let Some(icon) = registry.icon("ui", "arrow-left")? {
//!     println!("{:?}", icon.render(&RenderOptions::sized(24), &mut context));
//! }
//! # Ok::<(), icon_catalog::RegistryError>(())
//! ```
//!
//! # High level design
//!
//! 1.  *Icon sets*:
//!
//!     An [IconSet] is a named, typed source of icons with free-form settings (a folder, a sprite
//!     file, a font version...). [IconSetRegistry] validates, stores, and lists them.
//!
//! 2.  *Resolving*:
//!
//!     Each [IconSetType] has a [source::Source] adapter that scans the raw source and yields
//!     icons. Adapters never fail: a missing folder or a broken font resolves to no icons.
//!
//! 3.  *The catalog*:
//!
//!     Resolved icons are stored per set by a [Storage] backend and served through a memory tier
//!     and a durable, time-limited file tier. Saving or refreshing a set replaces its stored
//!     icons in one step and then invalidates its cache entries.
//!
//! 4.  *Rendering*:
//!
//!     [Icon::render] produces sanitized inline SVG, `<use>` references into sprites, or font
//!     glyph markup. A [RenderContext] collects which sets a page used, so
//!     [IconSetRegistry::context_assets] can list the stylesheets, scripts and fonts to include.

mod assets;
mod atomic;
mod cache;
mod catalog;
mod config;
mod error;
mod icon;
mod icon_set;
mod registry;
mod render;
pub mod source;
mod storage;
pub mod svg;

pub use assets::Asset;
pub use cache::CatalogCache;
pub use catalog::Catalog;
pub use config::{Config, ConfigError};
pub use error::{CacheError, RegistryError, StorageError, ValidationError};
pub use icon::*;
pub use icon_set::{IconSet, IconSetType, SetId, SetSettings};
pub use registry::{CatalogLookup, IconRef, IconSetRegistry};
pub use render::{RenderContext, RenderOptions};
pub use storage::{FileStorage, MemoryStorage, Storage};
