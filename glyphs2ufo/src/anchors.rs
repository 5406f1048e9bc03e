//! Propagating anchors from components to their composites
//!
//! Glyphs copies the anchors of a composite's components into the composite
//! on export. A component whose glyph has a mark anchor (one starting with
//! '_') is treated as a mark: it doesn't contribute anchors of its own, but it
//! moves the matching anchor of the base it sits on.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use kurbo::{Affine, Point};
use log::{debug, warn};

use crate::pen::to_kurbo_transform;

/// Add anchors from components to every composite in the default layer.
///
/// Components are processed before the glyphs that use them, so anchors
/// propagate through nested composites. Anchors already present on a
/// composite are kept, and an anchor is not propagated if the composite has
/// one whose name starts with the same name (e.g. an explicit `top_1` stops
/// `top` from being copied).
pub fn propagate_font_anchors(ufo: &mut norad::Font) {
    let layer = ufo.default_layer_mut();
    let names: Vec<String> = layer.iter().map(|g| g.name().to_string()).collect();
    let mut processed = HashSet::new();
    for name in names {
        propagate_glyph_anchors(layer, &name, &mut processed);
    }
}

struct ComponentRef {
    base: String,
    transform: Affine,
}

fn anchor_name(anchor: &norad::Anchor) -> &str {
    anchor.name.as_ref().map(|n| n.as_str()).unwrap_or_default()
}

fn is_mark_glyph(glyph: &norad::Glyph) -> bool {
    glyph.anchors.iter().any(|a| anchor_name(a).starts_with('_'))
}

fn propagate_glyph_anchors(
    layer: &mut norad::Layer,
    name: &str,
    processed: &mut HashSet<String>,
) {
    if !processed.insert(name.to_string()) {
        return;
    }
    let Some(components) = layer.get_glyph(name).map(|glyph| {
        glyph
            .components
            .iter()
            .map(|c| ComponentRef {
                base: c.base.to_string(),
                transform: to_kurbo_transform(&c.transform),
            })
            .collect::<Vec<_>>()
    }) else {
        return;
    };
    if components.is_empty() {
        return;
    }

    let mut base_components = Vec::new();
    let mut mark_components = Vec::new();
    let mut anchor_names = BTreeSet::new();
    for component in components {
        propagate_glyph_anchors(layer, &component.base, processed);
        let Some(base) = layer.get_glyph(&component.base) else {
            warn!(
                "'{name}' has a component '{}' which is not in the font",
                component.base
            );
            continue;
        };
        if is_mark_glyph(base) {
            mark_components.push(component);
        } else {
            anchor_names.extend(base.anchors.iter().map(|a| anchor_name(a).to_string()));
            base_components.push(component);
        }
    }

    let Some(existing) = layer.get_glyph(name).map(|glyph| {
        glyph
            .anchors
            .iter()
            .map(|a| anchor_name(a).to_string())
            .collect::<Vec<_>>()
    }) else {
        return;
    };

    let mut to_add: BTreeMap<String, Point> = BTreeMap::new();
    for anchor in anchor_names {
        if !existing.iter().any(|e| e.starts_with(anchor.as_str())) {
            collect_anchor(layer, &base_components, &anchor, &mut to_add);
        }
    }
    for component in mark_components.iter() {
        adjust_anchors(layer, component, &mut to_add);
    }

    if to_add.is_empty() {
        return;
    }
    debug!("'{name}' gains anchors {:?}", to_add.keys().collect::<Vec<_>>());
    let Some(glyph) = layer.get_glyph_mut(name) else {
        return;
    };
    for (anchor, pos) in to_add {
        let anchor_name = norad::Name::new(&anchor).ok();
        glyph
            .anchors
            .push(norad::Anchor::new(pos.x, pos.y, anchor_name, None, None));
    }
}

/// Position of `name` in each base component; with more than one base
/// (a ligature) the anchors are numbered, `top_1`, `top_2`...
fn collect_anchor(
    layer: &norad::Layer,
    components: &[ComponentRef],
    name: &str,
    to_add: &mut BTreeMap<String, Point>,
) {
    let found: Vec<Point> = components
        .iter()
        .filter_map(|component| {
            let glyph = layer.get_glyph(&component.base)?;
            let anchor = glyph.anchors.iter().find(|a| anchor_name(a) == name)?;
            Some(component.transform * Point::new(anchor.x, anchor.y))
        })
        .collect();
    match found.as_slice() {
        [] => (),
        [pos] => {
            to_add.insert(name.to_string(), *pos);
        }
        _ => {
            for (i, pos) in found.iter().enumerate() {
                to_add.insert(format!("{name}_{}", i + 1), *pos);
            }
        }
    }
}

/// A mark moves each anchor it has a matching mark anchor for
/// (`top` together with `_top`).
fn adjust_anchors(
    layer: &norad::Layer,
    component: &ComponentRef,
    to_add: &mut BTreeMap<String, Point>,
) {
    let Some(glyph) = layer.get_glyph(&component.base) else {
        return;
    };
    for anchor in glyph.anchors.iter() {
        let name = anchor_name(anchor);
        let mark_name = format!("_{name}");
        if to_add.contains_key(name) && glyph.anchors.iter().any(|a| anchor_name(a) == mark_name)
        {
            to_add.insert(
                name.to_string(),
                component.transform * Point::new(anchor.x, anchor.y),
            );
        }
    }
}
