use std::num::ParseIntError;

use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),
    #[error("Invalid node '{0}', expected 'x y TYPE'")]
    InvalidNode(String),
    #[error("Invalid node coordinate '{raw}'")]
    InvalidCoordinate {
        raw: String,
        inner: std::num::ParseFloatError,
    },
    #[error("Invalid glyph data: {0}")]
    GlyphData(#[from] GlyphDataError),
}

#[derive(Clone, Debug, Error)]
pub enum GlyphDataError {
    #[error("Error parsing XML: '{0}'")]
    ReaderError(#[from] quick_xml::Error),
    #[error("Error parsing XML attribute: '{0}'")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),
    #[error("Unknown category '{0}'")]
    InvalidCategory(SmolStr),
    #[error("Unknown subcategory '{0}'")]
    InvalidSubcategory(SmolStr),
    #[error("Unknown case '{0}'")]
    InvalidCase(SmolStr),
    #[error("the XML input did not start with a <glyphData> tag")]
    WrongFirstElement,
    #[error("Missing required attribute '{missing}' in '{attributes}'")]
    MissingRequiredAttribute {
        attributes: String,
        missing: &'static str,
    },
    #[error("Invalid unicode value '{raw}': '{inner}'")]
    InvalidUnicode { raw: String, inner: ParseIntError },
}

impl GlyphDataError {
    pub(crate) fn missing_attr(name: &'static str, raw_attrs: &[u8]) -> Self {
        let attributes = String::from_utf8_lossy(raw_attrs).into_owned();
        Self::MissingRequiredAttribute {
            attributes,
            missing: name,
        }
    }
}
