//! Feature file text: prefixes, classes, features and an automatic GDEF table

use std::collections::{BTreeMap, HashMap};

use glyphs_model::{
    glyphdata::{Category, GlyphData, Subcategory},
    Feature, FeatureClass, FeaturePrefix,
};

use crate::constants::{GLYPHLIB_PREFIX, GLYPH_ORDER_KEY};

fn automatic_marker(automatic: bool) -> &'static str {
    if automatic {
        "# automatic\n"
    } else {
        ""
    }
}

fn prefix_text(prefixes: &[FeaturePrefix]) -> String {
    prefixes
        .iter()
        .map(|p| {
            format!(
                "# Prefix: {}\n{}{}",
                p.name,
                automatic_marker(p.automatic),
                p.code.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn class_text(classes: &[FeatureClass]) -> String {
    classes
        .iter()
        .map(|c| {
            let at = if c.name.starts_with('@') { "" } else { "@" };
            format!(
                "{}{at}{} = [ {} ];",
                automatic_marker(c.automatic),
                c.name,
                c.code
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn feature_text(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| {
            let code = f.code.trim();
            let mut lines = vec![format!("feature {} {{", f.name)];
            if let Some(notes) = f.notes.as_deref().filter(|n| !n.is_empty()) {
                lines.push("# notes:".to_string());
                lines.extend(notes.lines().map(|line| format!("# {line}")));
            }
            if f.automatic {
                lines.push("# automatic".to_string());
            }
            if f.disabled {
                lines.push("# disabled".to_string());
                lines.extend(code.lines().map(|line| format!("#{line}")));
            } else {
                lines.push(code.to_string());
            }
            lines.push(format!("}} {};", f.name));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the complete feature file for a UFO.
///
/// Empty sections are skipped; if nothing remains the text is empty.
pub fn build_features(
    ufo: &norad::Font,
    prefixes: &[FeaturePrefix],
    classes: &[FeatureClass],
    features: &[Feature],
    glyph_data: &GlyphData,
) -> String {
    let gdef = build_gdef(ufo, glyph_data).unwrap_or_default();
    let blocks = [
        prefix_text(prefixes),
        class_text(classes),
        feature_text(features),
        gdef,
    ];
    let mut text = blocks
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    text.push('\n');
    if text.trim().is_empty() {
        return String::new();
    }
    text
}

/// Build a `table GDEF` statement with glyph classes and ligature carets.
///
/// Classes follow what Glyphs itself does on export:
///
/// * Ligature: subcategory "Ligature" and at least one attaching anchor
/// * Mark: category "Mark" and subcategory "Nonspacing" or "Spacing Combining"
/// * Base: any other glyph with an attaching anchor (e.g. "top", not "_top")
///
/// Returns None if no glyph falls into any class and there are no carets.
pub fn build_gdef(ufo: &norad::Font, glyph_data: &GlyphData) -> Option<String> {
    let mut bases = Vec::new();
    let mut ligatures = Vec::new();
    let mut marks = Vec::new();
    let mut carets: BTreeMap<&str, Vec<i64>> = BTreeMap::new();

    for glyph in ufo.default_layer().iter() {
        let name = glyph.name().as_str();
        let mut has_attaching_anchor = false;
        for anchor in glyph.anchors.iter() {
            let Some(anchor_name) = anchor.name.as_ref().map(|n| n.as_str()) else {
                continue;
            };
            if !anchor_name.is_empty() && !anchor_name.starts_with('_') {
                has_attaching_anchor = true;
            }
            if anchor_name.starts_with("caret_") {
                carets
                    .entry(name)
                    .or_default()
                    .push(anchor.x.round_ties_even() as i64);
            }
        }

        // glyph lib overrides win over the glyph data
        let category = lib_override::<Category>(glyph, "category")
            .or_else(|| glyph_data.category(name));
        let subcategory = lib_override::<Subcategory>(glyph, "subCategory")
            .or_else(|| glyph_data.subcategory(name));

        if subcategory == Some(Subcategory::Ligature) && has_attaching_anchor {
            ligatures.push(name);
        } else if category == Some(Category::Mark)
            && matches!(
                subcategory,
                Some(Subcategory::Nonspacing | Subcategory::SpacingCombining)
            )
        {
            marks.push(name);
        } else if has_attaching_anchor {
            bases.push(name);
        }
    }

    if bases.is_empty() && ligatures.is_empty() && marks.is_empty() && carets.is_empty() {
        return None;
    }

    let glyph_order: HashMap<&str, usize> = ufo
        .lib
        .get(GLYPH_ORDER_KEY)
        .and_then(|v| v.as_array())
        .map(|order| {
            order
                .iter()
                .filter_map(|v| v.as_string())
                .enumerate()
                .map(|(i, name)| (name, i))
                .collect()
        })
        .unwrap_or_default();
    let fmt = |mut names: Vec<&str>| {
        if names.is_empty() {
            return String::new();
        }
        names.sort_by_key(|name| glyph_order.get(name).copied().unwrap_or(usize::MAX));
        format!("[{}]", names.join(" "))
    };

    let mut lines = vec![
        "table GDEF {".to_string(),
        "  # automatic".to_string(),
        "  GlyphClassDef".to_string(),
        format!("    {}, # Base", fmt(bases)),
        format!("    {}, # Liga", fmt(ligatures)),
        format!("    {}, # Mark", fmt(marks)),
        "    ;".to_string(),
    ];
    for (glyph, mut positions) in carets {
        positions.sort();
        let positions = positions
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("  LigatureCaretByPos {glyph} {positions};"));
    }
    lines.push("} GDEF;".to_string());
    Some(lines.join("\n"))
}

fn lib_override<T: std::str::FromStr>(glyph: &norad::Glyph, key: &str) -> Option<T> {
    glyph
        .lib
        .get(&format!("{GLYPHLIB_PREFIX}{key}"))
        .and_then(|v| v.as_string())
        .and_then(|v| v.parse().ok())
}
