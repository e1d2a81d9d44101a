use crate::icon_set::{IconSetType, SetId};

/// Why an icon set could not be saved.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("handle `{0}` must start with a letter and contain only letters, digits and underscores")]
    InvalidHandle(String),
    #[error("handle `{0}` is already used by another icon set")]
    DuplicateHandle(String),
    #[error("unknown icon set type `{0}`")]
    UnknownType(String),
    #[error("icon set type `{0}` is not enabled")]
    TypeDisabled(IconSetType),
    #[error("icon set type cannot change from `{from}` to `{to}` once icons exist")]
    TypeChanged { from: IconSetType, to: IconSetType },
    #[error("missing setting `{0}`")]
    MissingSetting(&'static str),
    #[error("setting `{key}` is invalid: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no icon set with id {0}")]
    UnknownSet(SetId),
    #[error("icon set has not been saved yet")]
    Unsaved,
    #[error("handle `{0}` is already used by another icon set")]
    DuplicateHandle(String),
    #[error("storage i/o failed")]
    Io(#[from] std::io::Error),
    #[error("storage document could not be (de)serialized")]
    Serde(#[from] serde_json::Error),
    #[error("icon `{name}` appears twice in set {set_id}")]
    DuplicateIcon { set_id: SetId, name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache i/o failed")]
    Io(#[from] std::io::Error),
    #[error("cache entry could not be (de)serialized")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("icon set is invalid")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("icon set {set_id} was saved but its icons were not refreshed")]
    Refresh {
        set_id: SetId,
        #[source]
        source: Box<RegistryError>,
    },
}

/// Failure to read a source while scanning. Never leaves the adapters: it is logged and the
/// scan yields no icons.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AdapterError {
    #[error("source `{0}` not found")]
    NotFound(std::path::PathBuf),
    #[error("source could not be read")]
    Io(#[from] std::io::Error),
    #[error("malformed xml")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed json")]
    Json(#[from] serde_json::Error),
    #[error("not a font")]
    Font(#[from] ttf_parser::FaceParsingError),
}
