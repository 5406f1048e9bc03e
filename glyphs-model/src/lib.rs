//! In-memory object model for Glyphs font sources.
//!
//! Producing these structures from a `.glyphs` file is the job of a reader;
//! this crate only describes the data and a few helpers for querying it.

pub mod error;
mod font;
pub mod glyphdata;

pub use font::{
    AlignmentZone, Anchor, Annotation, Component, CustomParameter, Feature, FeatureClass,
    FeaturePrefix, Font, FontMaster, Glyph, Guide, Hint, Instance, Kerning, Layer,
    LayerBackground, Node, NodeType, Path, FONT_LEGACY_KEYS, MASTER_LEGACY_KEYS,
};
