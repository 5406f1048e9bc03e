//! determining glyph properties
//!
//! Glyphs derives a glyph's category, subcategory and production name from a
//! database keyed by glyph name. [`GlyphData`] is a read-only view of such a
//! database, built either from explicit entries or from a GlyphData xml file.
//!
//! Glyphs 2 data files put letter case into the subcategory ("Uppercase",
//! "Lowercase", "Smallcaps"); those are read into [`GlyphInfo::case`] and
//! leave the subcategory empty.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::GlyphDataError;

/// Information about a glyph
///
/// In general this is derived from data files, but the category and
/// subcategory can also be overridden per glyph by the font author.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphInfo {
    pub name: SmolStr,
    pub category: Category,
    pub subcategory: Subcategory,
    #[serde(default)]
    pub case: Case,
    pub unicode: Option<u32>,
    pub production: Option<SmolStr>,
    pub alt_names: Vec<SmolStr>,
}

impl GlyphInfo {
    pub fn new(name: impl Into<SmolStr>, category: Category, subcategory: Subcategory) -> Self {
        GlyphInfo {
            name: name.into(),
            category,
            subcategory,
            case: Case::None,
            unicode: None,
            production: None,
            alt_names: Vec::new(),
        }
    }
}

/// Generates `FromStr` and `Display` for a fieldless enum from its names in
/// the data files.
macro_rules! data_file_names {
    ($ty:ident { $($variant:ident => $name:literal,)* }) => {
        impl FromStr for $ty {
            type Err = SmolStr;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)*
                    _ => Err(s.into()),
                }
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $name,)*
                })
            }
        }
    };
}

/// The primary category for a given glyph
///
/// These categories are not the same as the unicode character categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Letter,
    Number,
    Punctuation,
    Symbol,
    Separator,
    Space,
    Mark,
    Other,
}

data_file_names!(Category {
    Letter => "Letter",
    Number => "Number",
    Punctuation => "Punctuation",
    Symbol => "Symbol",
    Separator => "Separator",
    Space => "Space",
    Mark => "Mark",
    Other => "Other",
});

/// The subcategory of a given glyph
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subcategory {
    #[default]
    None,
    Nonspacing,
    SpacingCombining,
    Enclosing,
    Ligature,
    DecimalDigit,
    Fraction,
    Currency,
    Math,
    Arrow,
    Geometry,
    Dash,
    Quote,
    Parenthesis,
    Space,
    Format,
    Modifier,
    Superscript,
    Spacing,
    Halfform,
    Matra,
    Syllable,
    Jamo,
    Radical,
    Compatibility,
    Small,
    Letter,
    Number,
    Emoji,
    Other,
}

data_file_names!(Subcategory {
    None => "None",
    Nonspacing => "Nonspacing",
    SpacingCombining => "Spacing Combining",
    Enclosing => "Enclosing",
    Ligature => "Ligature",
    DecimalDigit => "Decimal Digit",
    Fraction => "Fraction",
    Currency => "Currency",
    Math => "Math",
    Arrow => "Arrow",
    Geometry => "Geometry",
    Dash => "Dash",
    Quote => "Quote",
    Parenthesis => "Parenthesis",
    Space => "Space",
    Format => "Format",
    Modifier => "Modifier",
    Superscript => "Superscript",
    Spacing => "Spacing",
    Halfform => "Halfform",
    Matra => "Matra",
    Syllable => "Syllable",
    Jamo => "Jamo",
    Radical => "Radical",
    Compatibility => "Compatibility",
    Small => "Small",
    Letter => "Letter",
    Number => "Number",
    Emoji => "Emoji",
    Other => "Other",
});

/// Letter case
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Case {
    #[default]
    None,
    Upper,
    Lower,
    SmallCaps,
    Minor,
}

data_file_names!(Case {
    None => "noCase",
    Upper => "upper",
    Lower => "lower",
    SmallCaps => "smallCaps",
    Minor => "minor",
});

/// Read a `subCategory` attribute, which in Glyphs 2 files may be a case.
fn parse_subcategory(raw: &str) -> Result<(Subcategory, Option<Case>), GlyphDataError> {
    let case = match raw {
        "Uppercase" => Case::Upper,
        "Lowercase" => Case::Lower,
        "Smallcaps" => Case::SmallCaps,
        _ => {
            return raw
                .parse()
                .map(|sub| (sub, None))
                .map_err(GlyphDataError::InvalidSubcategory)
        }
    };
    Ok((Subcategory::None, Some(case)))
}

/// Name-keyed glyph info lookup.
#[derive(Clone, Debug, Default)]
pub struct GlyphData {
    entries: Vec<GlyphInfo>,
    by_name: HashMap<SmolStr, usize>,
    by_alt_name: HashMap<SmolStr, usize>,
}

impl GlyphData {
    /// Create a lookup from explicit entries.
    ///
    /// If names collide the first entry wins.
    pub fn new(entries: impl IntoIterator<Item = GlyphInfo>) -> Self {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_alt_name = HashMap::new();
        for (i, info) in entries.iter().enumerate() {
            by_name.entry(info.name.clone()).or_insert(i);
            for alt in info.alt_names.iter() {
                by_alt_name.entry(alt.clone()).or_insert(i);
            }
        }
        GlyphData {
            entries,
            by_name,
            by_alt_name,
        }
    }

    /// Load a GlyphData xml file, from Glyphs 2 or Glyphs 3.
    ///
    /// Attributes the converter has no use for (decompose, anchors, accents
    /// and the like) are ignored.
    pub fn from_xml(xml: &[u8]) -> Result<Self, GlyphDataError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut in_root = false;
        loop {
            match reader.read_event()? {
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) => (),
                Event::Start(e) if !in_root => {
                    if e.name().as_ref() != b"glyphData" {
                        return Err(GlyphDataError::WrongFirstElement);
                    }
                    in_root = true;
                }
                _ if !in_root => return Err(GlyphDataError::WrongFirstElement),
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"glyph" => {
                    entries.push(glyph_info(&e)?);
                }
                Event::Eof => break,
                _ => (),
            }
        }
        Ok(GlyphData::new(entries))
    }

    /// Find the info for a glyph by name, falling back to alternate names.
    pub fn query(&self, name: &str) -> Option<&GlyphInfo> {
        self.by_name
            .get(name)
            .or_else(|| self.by_alt_name.get(name))
            .map(|i| &self.entries[*i])
    }

    pub fn category(&self, name: &str) -> Option<Category> {
        self.query(name).map(|info| info.category)
    }

    pub fn subcategory(&self, name: &str) -> Option<Subcategory> {
        self.query(name).map(|info| info.subcategory)
    }

    /// The production name for a glyph; the glyph name itself if there is none.
    pub fn production_name(&self, name: &str) -> SmolStr {
        self.query(name)
            .and_then(|info| info.production.clone())
            .unwrap_or_else(|| name.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn glyph_info(element: &BytesStart) -> Result<GlyphInfo, GlyphDataError> {
    let mut name = None;
    let mut category = None;
    let mut subcategory = (Subcategory::None, None);
    let mut case = None;
    let mut unicode = None;
    let mut production = None;
    let mut alt_names = Vec::new();

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"name" => name = Some(SmolStr::new(&value)),
            b"category" => {
                let parsed = value.parse::<Category>();
                category = Some(parsed.map_err(GlyphDataError::InvalidCategory)?);
            }
            b"subCategory" => subcategory = parse_subcategory(&value)?,
            b"case" => {
                let parsed = value.parse::<Case>();
                case = Some(parsed.map_err(GlyphDataError::InvalidCase)?);
            }
            b"unicode" => {
                let code = u32::from_str_radix(&value, 16).map_err(|inner| {
                    GlyphDataError::InvalidUnicode {
                        raw: value.to_string(),
                        inner,
                    }
                })?;
                unicode = Some(code);
            }
            b"production" => production = Some(SmolStr::new(&value)),
            b"altNames" => {
                alt_names = value
                    .split(',')
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                    .map(SmolStr::new)
                    .collect()
            }
            _ => (),
        }
    }

    let (subcategory, case_from_subcategory) = subcategory;
    Ok(GlyphInfo {
        name: name.ok_or_else(|| GlyphDataError::missing_attr("name", element.attributes_raw()))?,
        category: category
            .ok_or_else(|| GlyphDataError::missing_attr("category", element.attributes_raw()))?,
        subcategory,
        // an explicit case attribute wins over one implied by the subcategory
        case: case.or(case_from_subcategory).unwrap_or_default(),
        unicode,
        production,
        alt_names,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const GLYPHS2_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE glyphData>
<glyphData format="Glyphs 2">
    <!-- Latin -->
    <glyph unicode="0041" name="A" category="Letter" subCategory="Uppercase" script="latin" description="LATIN CAPITAL LETTER A" anchors="top, bottom, ogonek" />
    <glyph unicode="00C0" name="Agrave" category="Letter" subCategory="Uppercase" script="latin" description="LATIN CAPITAL LETTER A WITH GRAVE" decompose="A, gravecomb" />
    <glyph unicode="0061" name="a" category="Letter" subCategory="Lowercase" script="latin" description="LATIN SMALL LETTER A" accents="grave, acute" />
    <glyph name="a.sc" category="Letter" subCategory="Smallcaps" />
    <glyph unicode="0301" name="acutecomb" category="Mark" subCategory="Nonspacing" script="latin" description="COMBINING ACUTE ACCENT" production="uni0301" altNames="acute.comb, " />
    <glyph name="f_f" category="Letter" subCategory="Ligature" description="LATIN SMALL LIGATURE FF" production="f_f" />
</glyphData>
"#;

    #[test]
    fn load_glyphs2_data() {
        let data = GlyphData::from_xml(GLYPHS2_XML.as_bytes()).unwrap();
        assert_eq!(6, data.len());

        let agrave = data.query("Agrave").unwrap();
        assert_eq!(Category::Letter, agrave.category);
        assert_eq!(Subcategory::None, agrave.subcategory);
        assert_eq!(Case::Upper, agrave.case);
        assert_eq!(Some(0xC0), agrave.unicode);

        assert_eq!(Case::Lower, data.query("a").unwrap().case);
        assert_eq!(Case::SmallCaps, data.query("a.sc").unwrap().case);
        assert_eq!(Some(Subcategory::Ligature), data.subcategory("f_f"));
    }

    #[test]
    fn lookups() {
        let data = GlyphData::from_xml(GLYPHS2_XML.as_bytes()).unwrap();
        assert_eq!(Some(Category::Mark), data.category("acute.comb"));
        assert_eq!(Some(Subcategory::Nonspacing), data.subcategory("acutecomb"));
        assert_eq!(
            vec![SmolStr::new("acute.comb")],
            data.query("acutecomb").unwrap().alt_names
        );
        assert_eq!("uni0301", data.production_name("acutecomb"));
        assert_eq!("A", data.production_name("A"));
        assert_eq!("nosuchglyph", data.production_name("nosuchglyph"));
        assert_eq!(None, data.category("nosuchglyph"));
    }

    #[test]
    fn explicit_case_wins() {
        let xml = r#"<glyphData format="Glyphs 3">
    <glyph name="A.alt" category="Letter" subCategory="Uppercase" case="minor" />
</glyphData>"#;
        let data = GlyphData::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(Case::Minor, data.query("A.alt").unwrap().case);
    }

    #[rstest]
    #[case("Spacing Combining", Subcategory::SpacingCombining)]
    #[case("Decimal Digit", Subcategory::DecimalDigit)]
    #[case("Nonspacing", Subcategory::Nonspacing)]
    #[case("None", Subcategory::None)]
    fn subcategory_names(#[case] name: &str, #[case] expected: Subcategory) {
        assert_eq!(Ok(expected), name.parse());
        assert_eq!(name, expected.to_string());
    }

    #[test]
    fn unknown_category_is_an_error() {
        let xml = r#"<glyphData><glyph name="x" category="Glyph" /></glyphData>"#;
        let err = GlyphData::from_xml(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, GlyphDataError::InvalidCategory(s) if s == "Glyph"));
    }

    #[test]
    fn name_is_required() {
        let xml = r#"<glyphData><glyph category="Letter" /></glyphData>"#;
        let err = GlyphData::from_xml(xml.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            GlyphDataError::MissingRequiredAttribute { missing: "name", .. }
        ));
    }

    #[test]
    fn first_entry_wins() {
        let data = GlyphData::new([
            GlyphInfo::new("a", Category::Letter, Subcategory::None),
            GlyphInfo::new("a", Category::Symbol, Subcategory::None),
        ]);
        assert_eq!(Some(Category::Letter), data.category("a"));
    }

    #[test]
    fn wrong_root() {
        let err = GlyphData::from_xml(b"<notGlyphData></notGlyphData>").unwrap_err();
        assert!(matches!(err, GlyphDataError::WrongFirstElement));
    }
}
