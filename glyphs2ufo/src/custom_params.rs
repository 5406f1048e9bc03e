//! Translation of Glyphs custom parameters to UFO fontinfo and lib entries

use glyphs_model::CustomParameter;
use log::warn;

use crate::{
    constants::{codepage_bit, GLYPHS_PREFIX, GLYPH_ORDER_KEY, UFO2FT_FILTERS_KEY},
    filters::parse_glyphs_filter,
};

/// Custom parameter name prefixes and the fontinfo prefixes they map to.
///
/// Applied in order; each is anchored at the start of the name.
const OPENTYPE_ATTR_PREFIXES: [(&str, &str); 20] = [
    ("hhea", "openTypeHhea"),
    ("description", "openTypeNameDescription"),
    ("license", "openTypeNameLicense"),
    ("licenseURL", "openTypeNameLicenseURL"),
    ("preferredFamilyName", "openTypeNamePreferredFamilyName"),
    ("preferredSubfamilyName", "openTypeNamePreferredSubfamilyName"),
    ("compatibleFullName", "openTypeNameCompatibleFullName"),
    ("sampleText", "openTypeNameSampleText"),
    ("WWSFamilyName", "openTypeNameWWSFamilyName"),
    ("WWSSubfamilyName", "openTypeNameWWSSubfamilyName"),
    ("panose", "openTypeOS2Panose"),
    ("typo", "openTypeOS2Typo"),
    ("unicodeRanges", "openTypeOS2UnicodeRanges"),
    ("codePageRanges", "openTypeOS2CodePageRanges"),
    ("weightClass", "openTypeOS2WeightClass"),
    ("widthClass", "openTypeOS2WidthClass"),
    ("win", "openTypeOS2Win"),
    ("vendorID", "openTypeOS2VendorID"),
    ("versionString", "openTypeNameVersion"),
    ("fsType", "openTypeOS2Type"),
];

/// Every attribute of a UFO 3 fontinfo.plist
const FONTINFO_ATTRIBUTES: &[&str] = &[
    "familyName",
    "styleName",
    "styleMapFamilyName",
    "styleMapStyleName",
    "versionMajor",
    "versionMinor",
    "year",
    "copyright",
    "trademark",
    "unitsPerEm",
    "descender",
    "xHeight",
    "capHeight",
    "ascender",
    "italicAngle",
    "note",
    "guidelines",
    "openTypeGaspRangeRecords",
    "openTypeHeadCreated",
    "openTypeHeadLowestRecPPEM",
    "openTypeHeadFlags",
    "openTypeHheaAscender",
    "openTypeHheaDescender",
    "openTypeHheaLineGap",
    "openTypeHheaCaretSlopeRise",
    "openTypeHheaCaretSlopeRun",
    "openTypeHheaCaretOffset",
    "openTypeNameDesigner",
    "openTypeNameDesignerURL",
    "openTypeNameManufacturer",
    "openTypeNameManufacturerURL",
    "openTypeNameLicense",
    "openTypeNameLicenseURL",
    "openTypeNameVersion",
    "openTypeNameUniqueID",
    "openTypeNameDescription",
    "openTypeNamePreferredFamilyName",
    "openTypeNamePreferredSubfamilyName",
    "openTypeNameCompatibleFullName",
    "openTypeNameSampleText",
    "openTypeNameWWSFamilyName",
    "openTypeNameWWSSubfamilyName",
    "openTypeNameRecords",
    "openTypeOS2WidthClass",
    "openTypeOS2WeightClass",
    "openTypeOS2Selection",
    "openTypeOS2VendorID",
    "openTypeOS2Panose",
    "openTypeOS2FamilyClass",
    "openTypeOS2UnicodeRanges",
    "openTypeOS2CodePageRanges",
    "openTypeOS2TypoAscender",
    "openTypeOS2TypoDescender",
    "openTypeOS2TypoLineGap",
    "openTypeOS2WinAscent",
    "openTypeOS2WinDescent",
    "openTypeOS2Type",
    "openTypeOS2SubscriptXSize",
    "openTypeOS2SubscriptYSize",
    "openTypeOS2SubscriptXOffset",
    "openTypeOS2SubscriptYOffset",
    "openTypeOS2SuperscriptXSize",
    "openTypeOS2SuperscriptYSize",
    "openTypeOS2SuperscriptXOffset",
    "openTypeOS2SuperscriptYOffset",
    "openTypeOS2StrikeoutSize",
    "openTypeOS2StrikeoutPosition",
    "openTypeVheaVertTypoAscender",
    "openTypeVheaVertTypoDescender",
    "openTypeVheaVertTypoLineGap",
    "openTypeVheaCaretSlopeRise",
    "openTypeVheaCaretSlopeRun",
    "openTypeVheaCaretOffset",
    "postscriptFontName",
    "postscriptFullName",
    "postscriptSlantAngle",
    "postscriptUniqueID",
    "postscriptUnderlineThickness",
    "postscriptUnderlinePosition",
    "postscriptIsFixedPitch",
    "postscriptBlueValues",
    "postscriptOtherBlues",
    "postscriptFamilyBlues",
    "postscriptFamilyOtherBlues",
    "postscriptStemSnapH",
    "postscriptStemSnapV",
    "postscriptBlueFuzz",
    "postscriptBlueShift",
    "postscriptBlueScale",
    "postscriptForceBold",
    "postscriptDefaultWidthX",
    "postscriptNominalWidthX",
    "postscriptWeightName",
    "postscriptDefaultCharacter",
    "postscriptWindowsCharacterSet",
    "macintoshFONDFamilyID",
    "macintoshFONDName",
    "woffMajorVersion",
    "woffMinorVersion",
    "woffMetadataUniqueID",
    "woffMetadataVendor",
    "woffMetadataCredits",
    "woffMetadataDescription",
    "woffMetadataLicense",
    "woffMetadataCopyright",
    "woffMetadataTrademark",
    "woffMetadataLicensee",
    "woffMetadataExtensions",
];

const USE_TYPO_METRICS: &str = "Use Typo Metrics";
const HAS_WWS_NAMES: &str = "Has WWS Names";

pub(crate) fn is_fontinfo_attribute(name: &str) -> bool {
    FONTINFO_ATTRIBUTES.contains(&name)
}

/// Collect custom parameters followed by whichever legacy attributes are set.
pub(crate) fn parse_custom_params<'a>(
    params: &[CustomParameter],
    legacy: impl IntoIterator<Item = (&'a str, Option<plist::Value>)>,
) -> Vec<(String, plist::Value)> {
    params
        .iter()
        .map(|p| (p.name.clone(), p.value.clone()))
        .chain(
            legacy
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key.to_string(), v))),
        )
        .collect()
}

/// Replace curly quotes with straight ones; they are the only non-ascii
/// characters expected in parameter names.
pub fn normalize_custom_param_name(name: &str) -> String {
    name.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Apply custom parameters to a UFO.
///
/// `info` holds fontinfo attributes keyed by their UFO name; `lib` is the
/// font lib. Names in `non_info` never go to fontinfo even if they name a
/// fontinfo attribute.
pub fn set_custom_params(
    info: &mut plist::Dictionary,
    lib: &mut plist::Dictionary,
    params: &[(String, plist::Value)],
    non_info: &[&str],
) {
    for (name, value) in params {
        let mut name = normalize_custom_param_name(name);
        let mut value = value.clone();

        if name == USE_TYPO_METRICS || name == HAS_WWS_NAMES {
            if is_truthy(&value) {
                let bit = if name == USE_TYPO_METRICS { 7 } else { 8 };
                append_fs_selection_bit(info, bit);
            }
            continue;
        }

        match name.as_str() {
            "disablesNiceNames" => {
                name = "useNiceNames".to_string();
                value = plist::Value::Integer((!is_truthy(&value) as i64).into());
            }
            "codePageRanges" => value = codepage_bits(&value),
            "GASP Table" => {
                name = "openTypeGaspRangeRecords".to_string();
                value = gasp_records(&value);
            }
            _ => (),
        }

        for (glyphs_prefix, ufo_prefix) in OPENTYPE_ATTR_PREFIXES {
            if let Some(rest) = name.strip_prefix(glyphs_prefix) {
                name = format!("{ufo_prefix}{rest}");
            }
        }

        if name == "underlinePosition" || name == "underlineThickness" {
            name = format!("postscriptU{}", &name[1..]);
        }

        if name.starts_with("openTypeOS2Win") {
            value = match value {
                plist::Value::Integer(i) => match i.as_signed() {
                    Some(v) if v < 0 => plist::Value::Integer((-v).into()),
                    _ => plist::Value::Integer(i),
                },
                plist::Value::Real(v) => plist::Value::Real(v.abs()),
                other => other,
            };
        }

        if name == "openTypeOS2WeightClass" || name == "openTypeOS2WidthClass" {
            match as_int(&value) {
                Some(v) => value = plist::Value::Integer(v.into()),
                None => warn!("{name} should be a number, not {value:?}"),
            }
        }

        if name == "glyphOrder" {
            lib.insert(GLYPH_ORDER_KEY.to_string(), value);
        } else if name == "Filter" {
            let Some(filter_string) = value.as_string() else {
                warn!("Filter should be a string, not {value:?}");
                continue;
            };
            // malformed filter strings are logged by the parser
            let Some(filter) = parse_glyphs_filter(filter_string) else {
                continue;
            };
            let filters = lib
                .entry(UFO2FT_FILTERS_KEY.to_string())
                .or_insert_with(|| plist::Value::Array(Vec::new()));
            if let Some(filters) = filters.as_array_mut() {
                filters.push(plist::Value::Dictionary(filter.to_plist()));
            }
        } else if is_fontinfo_attribute(&name) && !non_info.contains(&name.as_str()) {
            match check_fontinfo_value(&name, &value) {
                Ok(()) => {
                    info.insert(name, value);
                }
                Err(reason) => {
                    warn!("Custom parameter '{name}' is not a valid fontinfo value ({reason}), storing it in the lib");
                    lib.insert(format!("{GLYPHS_PREFIX}{name}"), value);
                }
            }
        } else {
            lib.insert(format!("{GLYPHS_PREFIX}{name}"), value);
        }
    }
}

fn append_fs_selection_bit(info: &mut plist::Dictionary, bit: i64) {
    let selection = info
        .entry("openTypeOS2Selection".to_string())
        .or_insert_with(|| plist::Value::Array(Vec::new()));
    if let Some(bits) = selection.as_array_mut() {
        bits.push(plist::Value::Integer(bit.into()));
    }
}

/// Make sure norad would accept this value for this fontinfo attribute.
fn check_fontinfo_value(name: &str, value: &plist::Value) -> Result<(), String> {
    let mut probe = plist::Dictionary::new();
    probe.insert(name.to_string(), value.clone());
    plist::from_value::<norad::FontInfo>(&plist::Value::Dictionary(probe))
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Glyphs' notion of truth: non-zero numbers, non-empty strings and containers
pub(crate) fn is_truthy(value: &plist::Value) -> bool {
    match value {
        plist::Value::Boolean(b) => *b,
        plist::Value::Integer(i) => i.as_signed().map(|v| v != 0).unwrap_or(true),
        plist::Value::Real(r) => *r != 0.0,
        plist::Value::String(s) => !s.is_empty(),
        plist::Value::Array(a) => !a.is_empty(),
        plist::Value::Dictionary(d) => !d.is_empty(),
        plist::Value::Data(d) => !d.is_empty(),
        _ => true,
    }
}

/// Integer value of a number or numeric string, truncating reals
pub(crate) fn as_int(value: &plist::Value) -> Option<i64> {
    match value {
        plist::Value::Integer(i) => i.as_signed(),
        plist::Value::Real(r) => Some(r.trunc() as i64),
        plist::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|r| r.trunc() as i64))
        }
        plist::Value::Boolean(b) => Some(*b as i64),
        _ => None,
    }
}

fn codepage_bits(value: &plist::Value) -> plist::Value {
    let Some(pages) = value.as_array() else {
        warn!("codePageRanges should be a list, not {value:?}");
        return value.clone();
    };
    let bits = pages
        .iter()
        .filter_map(|page| {
            let bit = as_int(page)
                .and_then(|p| u32::try_from(p).ok())
                .and_then(codepage_bit);
            if bit.is_none() {
                warn!("Unknown code page {page:?}, dropping it");
            }
            bit
        })
        .map(|bit| plist::Value::Integer((bit as i64).into()))
        .collect();
    plist::Value::Array(bits)
}

/// The indices of the bits set in `value`, lowest first
fn bin_to_int_list(value: i64) -> Vec<i64> {
    (0..64).filter(|bit| value & (1 << bit) != 0).collect()
}

fn gasp_records(value: &plist::Value) -> plist::Value {
    let Some(table) = value.as_dictionary() else {
        warn!("GASP Table should be a dictionary, not {value:?}");
        return value.clone();
    };
    let mut records: Vec<(i64, i64)> = table
        .iter()
        .filter_map(|(ppem, behavior)| {
            let record = as_int(&plist::Value::String(ppem.clone())).zip(as_int(behavior));
            if record.is_none() {
                warn!("Invalid GASP Table entry {ppem}: {behavior:?}");
            }
            record
        })
        .collect();
    records.sort_by_key(|(ppem, _)| *ppem);
    let records = records
        .into_iter()
        .map(|(ppem, behavior)| {
            let mut record = plist::Dictionary::new();
            record.insert("rangeMaxPPEM".into(), plist::Value::Integer(ppem.into()));
            let behavior = bin_to_int_list(behavior)
                .into_iter()
                .map(|bit| plist::Value::Integer(bit.into()))
                .collect();
            record.insert("rangeGaspBehavior".into(), plist::Value::Array(behavior));
            plist::Value::Dictionary(record)
        })
        .collect();
    plist::Value::Array(records)
}
