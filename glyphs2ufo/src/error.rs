use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Open path in '{glyph}' starts with an off-curve point")]
    OpenPathStartsOffCurve { glyph: SmolStr },
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("Layer '{layer_id}' of '{glyph}' is associated with unknown master '{master_id}'")]
    UnknownMaster {
        glyph: SmolStr,
        layer_id: SmolStr,
        master_id: SmolStr,
    },
    #[error("Font has no masters")]
    NoMasters,
    #[error("Unable to build fontinfo for master '{master_id}': {reason}")]
    InvalidFontInfo { master_id: SmolStr, reason: String },
}

impl Error {
    pub(crate) fn invalid_name(name: &str, err: impl std::fmt::Display) -> Self {
        Error::InvalidName {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}
