//! Transcribes a single Glyphs layer into a UFO glyph

use glyphs_model::{
    glyphdata::{Category, GlyphData, Subcategory},
    Anchor, Annotation, Component, Glyph, Guide, Hint, Layer, LayerBackground, Node, NodeType,
    Path,
};
use log::{trace, warn};

use crate::{
    constants::{
        glyphs_color, GLYPHLIB_PREFIX, GLYPHS_PREFIX, MARK_COLOR_KEY, POSTSCRIPT_NAMES_KEY,
    },
    error::Error,
    pen::{GlyphPointPen, PointPen, SegmentType},
};

pub(crate) const DEFAULT_LAYER_NAME: &str = "public.default";
const BACKGROUND_LAYER_NAME: &str = "public.background";

/// Add a glyph for `layer` to the UFO layer named `layer_name`.
///
/// Besides geometry this copies the Glyphs metadata that has a home in the UFO
/// and draws the layer background, if any, into the matching background layer.
pub fn load_glyph(
    ufo: &mut norad::Font,
    layer_name: &str,
    layer: &Layer,
    glyph: &Glyph,
    glyph_data: &GlyphData,
) -> Result<(), Error> {
    trace!("Loading '{}' layer '{}' into '{layer_name}'", glyph.name, layer.layer_id);
    let mut ufo_glyph = new_glyph(&glyph.name)?;

    if let Some(unicode) = glyph.unicode.as_deref() {
        for codepoint in parse_codepoints(&glyph.name, unicode) {
            ufo_glyph.codepoints.insert(codepoint);
        }
    }
    if let Some(note) = &glyph.note {
        ufo_glyph.note = Some(note.clone());
    }
    if let Some(last_change) = glyph.last_change {
        ufo_glyph.lib.insert(
            format!("{GLYPHLIB_PREFIX}lastChange"),
            crate::font::to_ufo_time(&last_change).into(),
        );
    }
    if let Some(color_index) = glyph.color.filter(|c| *c >= 0) {
        ufo_glyph.lib.insert(
            format!("{GLYPHLIB_PREFIX}ColorIndex"),
            plist::Value::Integer(color_index.into()),
        );
        match glyphs_color(color_index) {
            Some(color) => {
                ufo_glyph
                    .lib
                    .insert(MARK_COLOR_KEY.to_string(), color.into());
            }
            None => warn!(
                "'{}' uses color index {color_index} which has no known color",
                glyph.name
            ),
        }
    }
    if let Some(export) = glyph.export {
        ufo_glyph
            .lib
            .insert(format!("{GLYPHLIB_PREFIX}Export"), export.into());
    }

    let production_name = glyph
        .production_name
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| glyph_data.production_name(&glyph.name));
    if production_name != glyph.name {
        let names = ufo
            .lib
            .entry(POSTSCRIPT_NAMES_KEY.to_string())
            .or_insert_with(|| plist::Value::Dictionary(plist::Dictionary::new()));
        if let Some(names) = names.as_dictionary_mut() {
            names.insert(glyph.name.to_string(), production_name.as_str().into());
        }
    }

    for (key, layer_value, glyph_value) in [
        (
            "leftMetricsKey",
            &layer.left_metrics_key,
            &glyph.left_metrics_key,
        ),
        (
            "rightMetricsKey",
            &layer.right_metrics_key,
            &glyph.right_metrics_key,
        ),
        (
            "widthMetricsKey",
            &layer.width_metrics_key,
            &glyph.width_metrics_key,
        ),
    ] {
        if let Some(metrics_key) = layer_value
            .as_ref()
            .or(glyph_value.as_ref())
            .filter(|k| !k.is_empty())
        {
            ufo_glyph
                .lib
                .insert(format!("{GLYPHLIB_PREFIX}{key}"), metrics_key.as_str().into());
        }
    }

    // explicit overrides are kept in the lib so later steps (GDEF) see them
    let category = match glyph.category {
        Some(category) => {
            ufo_glyph.lib.insert(
                format!("{GLYPHLIB_PREFIX}category"),
                category.to_string().into(),
            );
            Some(category)
        }
        None => glyph_data.category(&glyph.name),
    };
    let subcategory = match glyph.sub_category {
        Some(subcategory) => {
            ufo_glyph.lib.insert(
                format!("{GLYPHLIB_PREFIX}subCategory"),
                subcategory.to_string().into(),
            );
            Some(subcategory)
        }
        None => glyph_data.subcategory(&glyph.name),
    };

    // width goes first, the background copies it
    if let Some(width) = layer.width {
        if category == Some(Category::Mark)
            && subcategory == Some(Subcategory::Nonspacing)
            && width > 0.0
        {
            // Glyphs zeroes nonspacing marks on export
            ufo_glyph
                .lib
                .insert(format!("{GLYPHLIB_PREFIX}originalWidth"), width.into());
            ufo_glyph.width = 0.0;
        } else {
            ufo_glyph.width = width;
        }
    }

    load_glyph_libdata(ufo, &mut ufo_glyph, layer_name, layer)?;

    let mut pen = GlyphPointPen::new(&mut ufo_glyph);
    draw_paths(&mut pen, &glyph.name, &layer.paths)?;
    draw_components(&mut pen, &layer.components)?;
    add_anchors(&mut ufo_glyph, &layer.anchors)?;

    target_layer(ufo, layer_name)?.insert_glyph(ufo_glyph);
    Ok(())
}

fn new_glyph(name: &str) -> Result<norad::Glyph, Error> {
    let name = norad::Name::new(name).map_err(|e| Error::invalid_name(name, e))?;
    Ok(norad::Glyph::new(name.as_str()))
}

/// The UFO layer with the given name, created if necessary
pub(crate) fn target_layer<'a>(
    ufo: &'a mut norad::Font,
    name: &str,
) -> Result<&'a mut norad::Layer, Error> {
    if name == DEFAULT_LAYER_NAME {
        return Ok(ufo.default_layer_mut());
    }
    if ufo.layers.get(name).is_none() {
        return ufo
            .layers
            .new_layer(name)
            .map_err(|e| Error::invalid_name(name, e));
    }
    ufo.layers
        .get_mut(name)
        .ok_or_else(|| Error::invalid_name(name, "layer not found"))
}

fn parse_codepoints(glyph_name: &str, raw: &str) -> Vec<char> {
    raw.split(',')
        .map(str::trim)
        .filter(|hex| !hex.is_empty())
        .filter_map(|hex| {
            let codepoint = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
            if codepoint.is_none() {
                warn!("'{glyph_name}' has invalid unicode value '{hex}', ignoring it");
            }
            codepoint
        })
        .collect()
}

fn load_glyph_libdata(
    ufo: &mut norad::Font,
    ufo_glyph: &mut norad::Glyph,
    layer_name: &str,
    layer: &Layer,
) -> Result<(), Error> {
    ufo_glyph.guidelines = to_ufo_guidelines(&layer.guides);
    if let Some(background) = layer.background.as_ref().filter(|bg| !bg.is_empty()) {
        set_glyph_background(ufo, ufo_glyph, layer_name, background)?;
    }

    let annotations: Vec<_> = layer
        .annotations
        .iter()
        .map(|a| plist::Value::Dictionary(annotation_to_plist(a)))
        .collect();
    if !annotations.is_empty() {
        ufo_glyph.lib.insert(
            format!("{GLYPHS_PREFIX}annotations"),
            plist::Value::Array(annotations),
        );
    }

    let hints: Vec<_> = layer
        .hints
        .iter()
        .map(|h| plist::Value::Dictionary(hint_to_plist(h)))
        .collect();
    if !hints.is_empty() {
        ufo_glyph
            .lib
            .insert(format!("{GLYPHS_PREFIX}hints"), plist::Value::Array(hints));
    }

    // per-component flags, stored as parallel lists
    let flags: [(&str, fn(&Component) -> Option<bool>); 2] =
        [("Alignment", |c| c.alignment), ("Locked", |c| c.locked)];
    for (key, flag) in flags {
        let values: Vec<bool> = layer.components.iter().filter_map(flag).collect();
        if values.iter().any(|v| *v) {
            ufo_glyph.lib.insert(
                format!("{GLYPHS_PREFIX}components{key}"),
                plist::Value::Array(values.into_iter().map(Into::into).collect()),
            );
        }
    }
    Ok(())
}

fn annotation_to_plist(annotation: &Annotation) -> plist::Dictionary {
    let mut dict = plist::Dictionary::new();
    if let Some(angle) = annotation.angle.filter(|v| *v != 0.0) {
        dict.insert("angle".into(), angle.into());
    }
    if let Some(pos) = annotation.position {
        dict.insert(
            "position".into(),
            plist::Value::Array(vec![pos.x.into(), pos.y.into()]),
        );
    }
    if let Some(text) = annotation.text.as_ref().filter(|t| !t.is_empty()) {
        dict.insert("text".into(), text.as_str().into());
    }
    if let Some(type_) = annotation.type_.filter(|v| *v != 0) {
        dict.insert("type".into(), plist::Value::Integer(type_.into()));
    }
    if let Some(width) = annotation.width.filter(|v| *v != 0.0) {
        dict.insert("width".into(), width.into());
    }
    dict
}

fn hint_to_plist(hint: &Hint) -> plist::Dictionary {
    let mut dict = plist::Dictionary::new();
    if let Some(horizontal) = hint.horizontal {
        dict.insert("horizontal".into(), horizontal.into());
    }
    if let Some(options) = hint.options {
        dict.insert("options".into(), plist::Value::Integer(options.into()));
    }
    if let Some(stem) = hint.stem {
        dict.insert("stem".into(), plist::Value::Integer(stem.into()));
    }
    if let Some(type_) = &hint.type_ {
        dict.insert("type".into(), type_.as_str().into());
    }
    for (key, coords) in [
        ("origin", hint.origin),
        ("other1", hint.other1),
        ("other2", hint.other2),
        ("place", hint.place),
        ("scale", hint.scale),
        ("target", hint.target),
    ] {
        // only complete coordinate pairs are kept
        if let Some([Some(a), Some(b)]) = coords {
            dict.insert(key.into(), plist::Value::Array(vec![a.into(), b.into()]));
        }
    }
    dict
}

/// Draw a layer background into the corresponding `.background` layer.
fn set_glyph_background(
    ufo: &mut norad::Font,
    ufo_glyph: &norad::Glyph,
    layer_name: &str,
    background: &LayerBackground,
) -> Result<(), Error> {
    let background_layer = if layer_name == DEFAULT_LAYER_NAME {
        BACKGROUND_LAYER_NAME.to_string()
    } else {
        format!("{layer_name}.background")
    };
    let mut bg_glyph = new_glyph(ufo_glyph.name().as_str())?;
    bg_glyph.width = ufo_glyph.width;

    let mut pen = GlyphPointPen::new(&mut bg_glyph);
    draw_paths(&mut pen, ufo_glyph.name().as_str(), &background.paths)?;
    draw_components(&mut pen, &background.components)?;
    add_anchors(&mut bg_glyph, &background.anchors)?;
    bg_glyph.guidelines = to_ufo_guidelines(&background.guides);

    target_layer(ufo, &background_layer)?.insert_glyph(bg_glyph);
    Ok(())
}

/// Draw Glyphs paths onto a point pen.
///
/// Glyphs stores the start node of a closed path last; open paths must
/// start on an on-curve node.
pub fn draw_paths(
    pen: &mut impl PointPen,
    glyph_name: &str,
    paths: &[Path],
) -> Result<(), Error> {
    for path in paths {
        pen.begin_path();
        let Some((last, rest)) = path.nodes.split_last() else {
            pen.end_path();
            continue;
        };
        let nodes: Box<dyn Iterator<Item = &Node>> = if path.closed {
            Box::new(std::iter::once(last).chain(rest))
        } else {
            let first = &path.nodes[0];
            if !matches!(first.node_type, NodeType::Line | NodeType::LineSmooth) {
                return Err(Error::OpenPathStartsOffCurve {
                    glyph: glyph_name.into(),
                });
            }
            pen.add_point(first.pt, Some(SegmentType::Move), false);
            Box::new(path.nodes[1..].iter())
        };
        for node in nodes {
            let segment_type = match node.node_type {
                NodeType::Line | NodeType::LineSmooth => Some(SegmentType::Line),
                NodeType::Curve | NodeType::CurveSmooth => Some(SegmentType::Curve),
                NodeType::QCurve | NodeType::QCurveSmooth => Some(SegmentType::QCurve),
                NodeType::OffCurve => None,
            };
            pen.add_point(node.pt, segment_type, node.node_type.is_smooth());
        }
        pen.end_path();
    }
    Ok(())
}

pub fn draw_components(pen: &mut impl PointPen, components: &[Component]) -> Result<(), Error> {
    for component in components {
        pen.add_component(&component.name, component.transform)?;
    }
    Ok(())
}

fn add_anchors(ufo_glyph: &mut norad::Glyph, anchors: &[Anchor]) -> Result<(), Error> {
    for anchor in anchors {
        let name = norad::Name::new(&anchor.name)
            .map_err(|e| Error::invalid_name(&anchor.name, e))?;
        ufo_glyph.anchors.push(norad::Anchor::new(
            anchor.pos.x,
            anchor.pos.y,
            Some(name),
            None,
            None,
        ));
    }
    Ok(())
}

/// Glyphs measures guide angles the other way around
pub(crate) fn to_ufo_guidelines(guides: &[Guide]) -> Vec<norad::Guideline> {
    guides
        .iter()
        .map(|guide| {
            let line = norad::Line::Angle {
                x: guide.position.x,
                y: guide.position.y,
                degrees: (360.0 - guide.angle).rem_euclid(360.0),
            };
            norad::Guideline::new(line, None, None, None)
        })
        .collect()
}
