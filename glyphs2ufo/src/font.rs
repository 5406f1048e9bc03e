//! Building one UFO per master: fontinfo, glyphs, groups, features, kerning

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use glyphs_model::{
    glyphdata::GlyphData, AlignmentZone, Font, FontMaster, Glyph, Instance, Layer,
    FONT_LEGACY_KEYS, MASTER_LEGACY_KEYS,
};
use indexmap::IndexMap;
use log::{debug, warn};
use ordered_float::OrderedFloat;
use plist::Value;
use smol_str::SmolStr;

use crate::{
    anchors::propagate_font_anchors,
    constants::{GLYPHS_PREFIX, GLYPH_ORDER_KEY},
    custom_params::{parse_custom_params, set_custom_params},
    error::Error,
    features::build_features,
    glyph::{load_glyph, to_ufo_guidelines, DEFAULT_LAYER_NAME},
    kerning::{load_kerning, KerningGroups},
};

/// Format a timestamp the way UFO fontinfo and Glyphs libs expect.
pub(crate) fn to_ufo_time(time: &DateTime<Utc>) -> String {
    time.format("%Y/%m/%d %H:%M:%S").to_string()
}

/// Style name from the master's style tokens, "Regular" if they are all empty.
pub fn build_style_name(width: &str, weight: &str, custom: &str, is_italic: bool) -> String {
    let italic = if is_italic { "Italic" } else { "" };
    let name = [custom, width, weight, italic]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        "Regular".to_string()
    } else {
        name
    }
}

/// The UFO `styleMapFamilyName` and `styleMapStyleName`.
///
/// Without a linked style (or with "Regular") the family name is extended by
/// the style name, minus the last "Regular", "Bold" and "Italic" that the
/// style map style already expresses.
pub fn build_stylemap_names(
    family_name: &str,
    style_name: &str,
    is_bold: bool,
    is_italic: bool,
    linked_style: Option<&str>,
) -> (String, String) {
    let style_map_style = match (is_bold, is_italic) {
        (true, true) => "bold italic",
        (true, false) => "bold",
        (false, true) => "italic",
        (false, false) => "regular",
    };
    let linked_style = match linked_style {
        Some(linked) if !linked.is_empty() && linked != "Regular" => linked.to_string(),
        _ => strip_linked_style(style_name, is_bold, is_italic),
    };
    let style_map_family = if linked_style.is_empty() {
        family_name.to_string()
    } else {
        format!("{family_name} {linked_style}")
    };
    (style_map_family, style_map_style.to_string())
}

fn strip_linked_style(style_name: &str, mut is_bold: bool, mut is_italic: bool) -> String {
    let mut is_regular = !(is_bold || is_italic);
    let mut parts = Vec::new();
    for part in style_name.split_whitespace().rev() {
        match part {
            "Regular" if is_regular => is_regular = false,
            "Bold" if is_bold => is_bold = false,
            "Italic" if is_italic => is_italic = false,
            _ => parts.push(part),
        }
    }
    parts.reverse();
    parts.join(" ")
}

/// PostScript blue values from alignment zones.
///
/// The baseline zone and every zone growing upwards are blue values, the
/// rest are other blues. Both lists are always set.
fn set_blue_values(info: &mut plist::Dictionary, zones: &[AlignmentZone]) {
    let mut zones = zones.to_vec();
    zones.sort_by_key(|z| (OrderedFloat(z.position), OrderedFloat(z.size)));
    let mut blue_values = Vec::new();
    let mut other_blues = Vec::new();
    for zone in zones {
        let values = if zone.position == 0.0 || zone.size >= 0.0 {
            &mut blue_values
        } else {
            &mut other_blues
        };
        let (a, b) = (zone.position, zone.position + zone.size);
        values.extend([a.min(b), a.max(b)].map(Value::Real));
    }
    info.insert("postscriptBlueValues".to_string(), Value::Array(blue_values));
    info.insert("postscriptOtherBlues".to_string(), Value::Array(other_blues));
}

fn real_list(values: &[f64]) -> Value {
    Value::Array(values.iter().copied().map(Value::Real).collect())
}

/// Glyphs' defaults where they differ from what a UFO compiler assumes
fn set_default_params(info: &mut plist::Dictionary) {
    info.entry("openTypeOS2Type".to_string())
        .or_insert_with(|| Value::Array(vec![Value::Integer(3i64.into())]));
    info.entry("postscriptUnderlineThickness".to_string())
        .or_insert_with(|| Value::Integer(50i64.into()));
    info.entry("postscriptUnderlinePosition".to_string())
        .or_insert_with(|| Value::Integer((-100i64).into()));
}

/// A UFO with fontinfo and lib filled in for one master, and no glyphs yet.
fn build_master_ufo(
    font: &Font,
    master: &FontMaster,
    family_name: &str,
    font_params: &[(String, Value)],
) -> Result<norad::Font, Error> {
    let mut ufo = norad::Font::new();
    // fontinfo is collected under UFO names so custom parameters can
    // override anything set before them
    let mut info = plist::Dictionary::new();

    if let Some(date) = &font.date {
        info.insert("openTypeHeadCreated".to_string(), to_ufo_time(date).into());
    }
    if let Some(units_per_em) = font.units_per_em {
        info.insert(
            "unitsPerEm".to_string(),
            Value::Integer(i64::from(units_per_em).into()),
        );
    }
    info.insert(
        "versionMajor".to_string(),
        Value::Integer(i64::from(font.version_major).into()),
    );
    info.insert(
        "versionMinor".to_string(),
        Value::Integer(i64::from(font.version_minor).into()),
    );
    for (key, value) in [
        ("copyright", &font.copyright),
        ("openTypeNameDesigner", &font.designer),
        ("openTypeNameDesignerURL", &font.designer_url),
        ("openTypeNameManufacturer", &font.manufacturer),
        ("openTypeNameManufacturerURL", &font.manufacturer_url),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            info.insert(key.to_string(), value.into());
        }
    }

    for (key, value) in [
        ("ascender", master.ascender),
        ("capHeight", master.cap_height),
        ("descender", master.descender),
        ("xHeight", master.x_height),
    ] {
        if let Some(value) = value {
            info.insert(key.to_string(), Value::Real(value));
        }
    }
    if !master.horizontal_stems.is_empty() {
        info.insert(
            "postscriptStemSnapH".to_string(),
            real_list(&master.horizontal_stems),
        );
    }
    if !master.vertical_stems.is_empty() {
        info.insert(
            "postscriptStemSnapV".to_string(),
            real_list(&master.vertical_stems),
        );
    }
    // Glyphs measures slant clockwise, UFO counter-clockwise
    let italic_angle = -master.italic_angle;
    let is_italic = italic_angle != 0.0;
    if is_italic {
        info.insert("italicAngle".to_string(), Value::Real(italic_angle));
    }

    for (key, value) in [
        ("weight", &master.weight),
        ("width", &master.width),
        ("custom", &master.custom),
    ] {
        if !value.is_empty() {
            ufo.lib
                .insert(format!("{GLYPHS_PREFIX}{key}"), value.as_str().into());
        }
    }

    let width = if master.width == "Regular" {
        ""
    } else {
        master.width.as_str()
    };
    let style_name = build_style_name(width, &master.weight, &master.custom, is_italic);
    let (style_map_family, style_map_style) = build_stylemap_names(
        family_name,
        &style_name,
        style_name == "Bold",
        is_italic,
        None,
    );
    info.insert("familyName".to_string(), family_name.into());
    info.insert("styleName".to_string(), style_name.into());
    info.insert("styleMapFamilyName".to_string(), style_map_family.into());
    info.insert("styleMapStyleName".to_string(), style_map_style.into());

    set_blue_values(&mut info, &master.alignment_zones);

    for (key, value) in font.user_data.iter() {
        ufo.lib.insert(key.clone(), value.clone());
    }
    if !master.user_data.is_empty() {
        ufo.lib.insert(
            format!("{GLYPHS_PREFIX}fontMaster.userData"),
            Value::Dictionary(master.user_data.clone()),
        );
    }

    set_custom_params(&mut info, &mut ufo.lib, font_params, &[]);
    // the legacy master values look like fontinfo but belong to Glyphs
    let master_params = parse_custom_params(
        &master.custom_parameters,
        MASTER_LEGACY_KEYS
            .iter()
            .map(|key| (*key, master.legacy_value(key))),
    );
    set_custom_params(&mut info, &mut ufo.lib, &master_params, &MASTER_LEGACY_KEYS);
    set_default_params(&mut info);

    ufo.font_info = plist::from_value(&Value::Dictionary(info)).map_err(|e| {
        Error::InvalidFontInfo {
            master_id: master.id.clone(),
            reason: e.to_string(),
        }
    })?;
    if !master.guides.is_empty() {
        ufo.font_info.guidelines = Some(to_ufo_guidelines(&master.guides));
    }
    ufo.lib.insert(
        format!("{GLYPHS_PREFIX}fontMasterID"),
        master.id.as_str().into(),
    );
    Ok(ufo)
}

/// Create a UFO for every master, keyed by master id in master order.
fn generate_base_fonts(
    font: &Font,
    family_name: &str,
) -> Result<IndexMap<SmolStr, norad::Font>, Error> {
    let font_params = parse_custom_params(
        &font.custom_parameters,
        FONT_LEGACY_KEYS.iter().map(|key| (*key, font.legacy_value(key))),
    );
    font.masters
        .iter()
        .map(|master| {
            debug!("Creating UFO for master '{}'", master.id);
            build_master_ufo(font, master, family_name, &font_params)
                .map(|ufo| (master.id.clone(), ufo))
        })
        .collect()
}

fn unknown_master(glyph: &Glyph, layer: &Layer) -> Error {
    Error::UnknownMaster {
        glyph: glyph.name.clone(),
        layer_id: layer.layer_id.clone(),
        master_id: layer.master_id().into(),
    }
}

/// The glyph order stored by the `glyphOrder` custom parameter, followed by
/// any glyphs it doesn't list in source order.
fn glyph_order(first_ufo: &norad::Font, glyphs: &[Glyph]) -> Vec<SmolStr> {
    let mut order: Vec<SmolStr> = first_ufo
        .lib
        .get(GLYPH_ORDER_KEY)
        .and_then(|v| v.as_array())
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_string())
                .map(SmolStr::new)
                .collect()
        })
        .unwrap_or_default();
    let listed: HashSet<_> = order.iter().cloned().collect();
    order.extend(
        glyphs
            .iter()
            .filter(|g| !listed.contains(&g.name))
            .map(|g| g.name.clone()),
    );
    order
}

/// Convert every master of `font` to a UFO, in master order.
pub(crate) fn build_ufos(
    font: &Font,
    glyph_data: &GlyphData,
    family_name: &str,
    propagate_anchors: bool,
) -> Result<Vec<norad::Font>, Error> {
    let mut ufos = generate_base_fonts(font, family_name)?;
    let Some(first_ufo) = ufos.values().next() else {
        return Err(Error::NoMasters);
    };
    let glyph_order = glyph_order(first_ufo, &font.glyphs);

    let mut groups = KerningGroups::default();
    // layers that aren't a master's own go in after all master layers
    let mut associated_layers = Vec::new();
    for glyph in font.glyphs.iter() {
        groups.add_glyph(glyph);
        for layer in glyph.layers.iter() {
            if !layer.is_master_layer() {
                if layer.name.is_some() {
                    associated_layers.push((glyph, layer));
                }
                continue;
            }
            let ufo = ufos
                .get_mut(layer.layer_id.as_str())
                .ok_or_else(|| unknown_master(glyph, layer))?;
            load_glyph(ufo, DEFAULT_LAYER_NAME, layer, glyph, glyph_data)?;
        }
    }

    for (glyph, layer) in associated_layers {
        let Some(layer_name) = layer.name.as_deref() else {
            continue;
        };
        let ufo = ufos
            .get_mut(layer.master_id())
            .ok_or_else(|| unknown_master(glyph, layer))?;
        load_glyph(ufo, layer_name, layer, glyph, glyph_data)?;
    }

    let glyph_order = Value::Array(
        glyph_order
            .iter()
            .map(|name| Value::String(name.to_string()))
            .collect(),
    );
    for ufo in ufos.values_mut() {
        ufo.lib
            .insert(GLYPH_ORDER_KEY.to_string(), glyph_order.clone());
        if propagate_anchors {
            propagate_font_anchors(ufo);
        }
        ufo.features = build_features(
            ufo,
            &font.feature_prefixes,
            &font.classes,
            &font.features,
            glyph_data,
        );
        groups.commit(ufo)?;
    }
    debug!("{} kerning groups in each UFO", groups.len());

    for (master_id, kerning) in font.kerning.iter() {
        let Some(ufo) = ufos.get_mut(master_id) else {
            warn!("Kerning for unknown master '{master_id}' ignored");
            continue;
        };
        let report = load_kerning(ufo, kerning)?;
        if !report.missing_groups.is_empty() || !report.conflicts.is_empty() {
            warn!(
                "Kerning of master '{master_id}': {} rules dropped for missing groups, {} class/glyph conflicts resolved",
                report.missing_groups.len(),
                report.conflicts.len()
            );
        }
    }

    Ok(ufos.into_values().collect())
}

/// Instances whose `familyName` custom parameter equals `family_name`;
/// None matches instances without the parameter.
pub(crate) fn filter_instances_by_family<'a>(
    instances: &'a [Instance],
    family_name: Option<&'a str>,
) -> impl Iterator<Item = &'a Instance> + 'a {
    instances
        .iter()
        .filter(move |instance| instance.family_name() == family_name)
}
