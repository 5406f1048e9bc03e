//! Builders for small source fonts

use glyphs_model::{
    glyphdata::{Category, GlyphData, GlyphInfo, Subcategory},
    Font, FontMaster, Glyph, Layer, NodeType, Path,
};

pub(crate) fn master(id: &str, weight: &str) -> FontMaster {
    FontMaster {
        id: id.into(),
        ascender: Some(800.0),
        cap_height: Some(700.0),
        descender: Some(-200.0),
        x_height: Some(500.0),
        width: "Regular".to_string(),
        weight: weight.to_string(),
        ..Default::default()
    }
}

pub(crate) fn square(size: f64) -> Path {
    let mut path = Path::new(true);
    path.add((0.0, 0.0), NodeType::Line);
    path.add((size, 0.0), NodeType::Line);
    path.add((size, size), NodeType::Line);
    path.add((0.0, size), NodeType::Line);
    path
}

pub(crate) fn master_layer(master_id: &str, width: f64) -> Layer {
    Layer {
        layer_id: master_id.into(),
        width: Some(width),
        paths: vec![square(width / 2.0)],
        ..Default::default()
    }
}

/// A glyph with one layer per master id
pub(crate) fn glyph(name: &str, master_ids: &[&str]) -> Glyph {
    let mut glyph = Glyph::new(name);
    glyph.layers = master_ids.iter().map(|id| master_layer(id, 500.0)).collect();
    glyph
}

/// A family with a regular and a bold master and glyphs `a` and `b`
pub(crate) fn two_master_font() -> Font {
    Font {
        app_version: Some(1230),
        family_name: "Test Sans".to_string(),
        units_per_em: Some(1000),
        version_major: 1,
        version_minor: 2,
        masters: vec![master("m01", "Regular"), master("m02", "Bold")],
        glyphs: vec![glyph("a", &["m01", "m02"]), glyph("b", &["m01", "m02"])],
        ..Default::default()
    }
}

pub(crate) fn glyph_data() -> GlyphData {
    GlyphData::new([GlyphInfo {
        unicode: Some(0x301),
        production: Some("uni0301".into()),
        ..GlyphInfo::new("acutecomb", Category::Mark, Subcategory::Nonspacing)
    }])
}
