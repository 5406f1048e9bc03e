//! The Glyphs source object graph.
//!
//! Everything here is plain data with public fields; a reader fills it in and
//! converters treat it as read-only.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::Error;
use crate::glyphdata::{Category, Subcategory};

/// Font attributes that older Glyphs versions stored outside of custom parameters.
pub const FONT_LEGACY_KEYS: [&str; 3] = [
    "DisplayStrings",
    "disablesAutomaticAlignment",
    "disablesNiceNames",
];

/// Master attributes that older Glyphs versions stored outside of custom parameters.
pub const MASTER_LEGACY_KEYS: [&str; 3] = ["customValue", "weightValue", "widthValue"];

/// Kerning for a single master: left side => right side => value.
///
/// A side is either a glyph name or a group reference (`@MMK_L_x`, `@MMK_R_x`).
pub type Kerning = IndexMap<SmolStr, IndexMap<SmolStr, f64>>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub app_version: Option<u32>,
    pub family_name: String,
    pub units_per_em: Option<u16>,
    pub version_major: i32,
    pub version_minor: u32,
    pub date: Option<DateTime<Utc>>,
    pub copyright: Option<String>,
    pub designer: Option<String>,
    pub designer_url: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_url: Option<String>,
    pub user_data: plist::Dictionary,
    pub masters: Vec<FontMaster>,
    pub glyphs: Vec<Glyph>,
    /// Keyed by master id, in source order
    pub kerning: IndexMap<SmolStr, Kerning>,
    pub feature_prefixes: Vec<FeaturePrefix>,
    pub classes: Vec<FeatureClass>,
    pub features: Vec<Feature>,
    pub instances: Vec<Instance>,
    pub custom_parameters: Vec<CustomParameter>,
    pub display_strings: Option<Vec<String>>,
    pub disables_automatic_alignment: Option<bool>,
    pub disables_nice_names: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FontMaster {
    pub id: SmolStr,
    pub ascender: Option<f64>,
    pub cap_height: Option<f64>,
    pub descender: Option<f64>,
    pub x_height: Option<f64>,
    pub horizontal_stems: Vec<f64>,
    pub vertical_stems: Vec<f64>,
    pub italic_angle: f64,
    pub width: String,
    pub weight: String,
    pub custom: String,
    pub alignment_zones: Vec<AlignmentZone>,
    pub guides: Vec<Guide>,
    pub user_data: plist::Dictionary,
    pub custom_parameters: Vec<CustomParameter>,
    pub weight_value: Option<f64>,
    pub width_value: Option<f64>,
    pub custom_value: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentZone {
    pub position: f64,
    pub size: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub position: Point,
    pub angle: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomParameter {
    pub name: String,
    pub value: plist::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub name: SmolStr,
    /// Hex codepoint(s), comma separated when there is more than one
    pub unicode: Option<String>,
    pub layers: Vec<Layer>,
    pub category: Option<Category>,
    pub sub_category: Option<Subcategory>,
    pub production_name: Option<SmolStr>,
    pub left_kerning_group: Option<SmolStr>,
    pub right_kerning_group: Option<SmolStr>,
    pub left_metrics_key: Option<String>,
    pub right_metrics_key: Option<String>,
    pub width_metrics_key: Option<String>,
    pub export: Option<bool>,
    pub last_change: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub color: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub layer_id: SmolStr,
    pub name: Option<String>,
    pub associated_master_id: Option<SmolStr>,
    pub width: Option<f64>,
    pub paths: Vec<Path>,
    pub components: Vec<Component>,
    pub anchors: Vec<Anchor>,
    pub guides: Vec<Guide>,
    pub background: Option<LayerBackground>,
    pub hints: Vec<Hint>,
    pub annotations: Vec<Annotation>,
    pub left_metrics_key: Option<String>,
    pub right_metrics_key: Option<String>,
    pub width_metrics_key: Option<String>,
}

/// The background of a layer; drawn into a separate UFO layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerBackground {
    pub paths: Vec<Path>,
    pub components: Vec<Component>,
    pub anchors: Vec<Anchor>,
    pub guides: Vec<Guide>,
}

impl LayerBackground {
    /// True if there is nothing to draw into a background layer.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
            && self.components.is_empty()
            && self.anchors.is_empty()
            && self.guides.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub closed: bool,
    pub nodes: Vec<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub pt: Point,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Line,
    LineSmooth,
    OffCurve,
    Curve,
    CurveSmooth,
    QCurve,
    QCurveSmooth,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: SmolStr,
    pub transform: Affine,
    pub alignment: Option<bool>,
    pub locked: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: SmolStr,
    pub pos: Point,
}

/// A TrueType/PostScript hint as stored by Glyphs.
///
/// The coordinate pairs are kept as options per axis because Glyphs
/// sometimes writes only one of them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub horizontal: Option<bool>,
    pub options: Option<i64>,
    pub stem: Option<i64>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub origin: Option<[Option<f64>; 2]>,
    pub other1: Option<[Option<f64>; 2]>,
    pub other2: Option<[Option<f64>; 2]>,
    pub place: Option<[Option<f64>; 2]>,
    pub scale: Option<[Option<f64>; 2]>,
    pub target: Option<[Option<f64>; 2]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub angle: Option<f64>,
    pub position: Option<Point>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<i64>,
    pub width: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturePrefix {
    pub name: String,
    pub code: String,
    pub automatic: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureClass {
    pub name: String,
    pub code: String,
    pub automatic: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub code: String,
    pub automatic: bool,
    pub disabled: bool,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub exports: bool,
    pub weight_value: Option<f64>,
    pub width_value: Option<f64>,
    pub custom_value: Option<f64>,
    pub weight_class: Option<String>,
    pub width_class: Option<String>,
    pub is_bold: bool,
    pub is_italic: bool,
    pub linked_style: Option<String>,
    pub custom_parameters: Vec<CustomParameter>,
}

impl Font {
    pub fn get_glyph(&self, glyphname: &str) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.name == glyphname)
    }

    /// The value of one of [`FONT_LEGACY_KEYS`], if set.
    pub fn legacy_value(&self, key: &str) -> Option<plist::Value> {
        match key {
            "DisplayStrings" => self.display_strings.as_ref().map(|strings| {
                plist::Value::Array(strings.iter().cloned().map(Into::into).collect())
            }),
            "disablesAutomaticAlignment" => {
                self.disables_automatic_alignment.map(plist::Value::Boolean)
            }
            "disablesNiceNames" => self.disables_nice_names.map(plist::Value::Boolean),
            _ => None,
        }
    }
}

impl FontMaster {
    /// The value of one of [`MASTER_LEGACY_KEYS`], if set.
    pub fn legacy_value(&self, key: &str) -> Option<plist::Value> {
        match key {
            "customValue" => self.custom_value,
            "weightValue" => self.weight_value,
            "widthValue" => self.width_value,
            _ => None,
        }
        .map(plist::Value::Real)
    }
}

impl Glyph {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Glyph {
            name: name.into(),
            unicode: None,
            layers: Vec::new(),
            category: None,
            sub_category: None,
            production_name: None,
            left_kerning_group: None,
            right_kerning_group: None,
            left_metrics_key: None,
            right_metrics_key: None,
            width_metrics_key: None,
            export: None,
            last_change: None,
            note: None,
            color: None,
        }
    }
}

impl Layer {
    /// The master this layer belongs to.
    ///
    /// For master layers this is the layer id itself.
    pub fn master_id(&self) -> &str {
        self.associated_master_id
            .as_deref()
            .unwrap_or(self.layer_id.as_str())
    }

    /// True if this is a layer for a master rather than an extra layer
    /// (brace, bracket, or a plain named layer) associated with one.
    pub fn is_master_layer(&self) -> bool {
        self.master_id() == self.layer_id
    }
}

impl Path {
    pub fn new(closed: bool) -> Path {
        Path {
            nodes: Vec::new(),
            closed,
        }
    }

    pub fn add(&mut self, pt: impl Into<Point>, node_type: NodeType) {
        let pt = pt.into();
        self.nodes.push(Node { pt, node_type });
    }
}

impl Component {
    pub fn new(name: impl Into<SmolStr>, transform: Affine) -> Self {
        Component {
            name: name.into(),
            transform,
            alignment: None,
            locked: None,
        }
    }
}

impl Anchor {
    pub fn new(name: impl Into<SmolStr>, pos: impl Into<Point>) -> Self {
        Anchor {
            name: name.into(),
            pos: pos.into(),
        }
    }
}

impl CustomParameter {
    pub fn new(name: impl Into<String>, value: impl Into<plist::Value>) -> Self {
        CustomParameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Instance {
    /// The `familyName` custom parameter, if any.
    pub fn family_name(&self) -> Option<&str> {
        self.custom_parameters
            .iter()
            .rev()
            .find(|p| p.name == "familyName")
            .and_then(|p| p.value.as_string())
    }
}

impl NodeType {
    pub fn is_smooth(self) -> bool {
        matches!(
            self,
            NodeType::LineSmooth | NodeType::CurveSmooth | NodeType::QCurveSmooth
        )
    }
}

impl FromStr for NodeType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Glyphs 2 style
            "LINE" => Ok(NodeType::Line),
            "LINE SMOOTH" => Ok(NodeType::LineSmooth),
            "OFFCURVE" => Ok(NodeType::OffCurve),
            "CURVE" => Ok(NodeType::Curve),
            "CURVE SMOOTH" => Ok(NodeType::CurveSmooth),
            "QCURVE" => Ok(NodeType::QCurve),
            "QCURVE SMOOTH" => Ok(NodeType::QCurveSmooth),
            // Glyphs 3 style
            "l" => Ok(NodeType::Line),
            "ls" => Ok(NodeType::LineSmooth),
            "o" => Ok(NodeType::OffCurve),
            "c" => Ok(NodeType::Curve),
            "cs" => Ok(NodeType::CurveSmooth),
            "q" => Ok(NodeType::QCurve),
            "qs" => Ok(NodeType::QCurveSmooth),
            _ => Err(Error::UnknownNodeType(s.to_string())),
        }
    }
}

impl FromStr for Node {
    type Err = Error;

    /// Parses the Glyphs 2 form, e.g. `"354 183 LINE SMOOTH"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spl = s.trim().splitn(3, ' ');
        let (Some(x), Some(y), Some(node_type)) = (spl.next(), spl.next(), spl.next()) else {
            return Err(Error::InvalidNode(s.to_string()));
        };
        let coord = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|inner| Error::InvalidCoordinate {
                    raw: raw.to_string(),
                    inner,
                })
        };
        Ok(Node {
            pt: Point::new(coord(x)?, coord(y)?),
            node_type: node_type.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("LINE", NodeType::Line)]
    #[case("LINE SMOOTH", NodeType::LineSmooth)]
    #[case("OFFCURVE", NodeType::OffCurve)]
    #[case("CURVE SMOOTH", NodeType::CurveSmooth)]
    #[case("QCURVE", NodeType::QCurve)]
    #[case("l", NodeType::Line)]
    #[case("cs", NodeType::CurveSmooth)]
    #[case("o", NodeType::OffCurve)]
    #[case("qs", NodeType::QCurveSmooth)]
    fn parse_node_types(#[case] raw: &str, #[case] expected: NodeType) {
        assert_eq!(expected, raw.parse::<NodeType>().unwrap());
    }

    #[test]
    fn unknown_node_type() {
        assert!(matches!(
            "SPLINE".parse::<NodeType>(),
            Err(Error::UnknownNodeType(t)) if t == "SPLINE"
        ));
    }

    #[test]
    fn parse_v2_node() {
        let node: Node = "354 183 LINE SMOOTH".parse().unwrap();
        assert_eq!(
            Node {
                pt: Point::new(354.0, 183.0),
                node_type: NodeType::LineSmooth,
            },
            node
        );
        assert!(node.node_type.is_smooth());
    }

    #[test]
    fn parse_bad_nodes() {
        assert!(matches!(
            "354 LINE".parse::<Node>(),
            Err(Error::InvalidNode(_))
        ));
        assert!(matches!(
            "a 183 LINE".parse::<Node>(),
            Err(Error::InvalidCoordinate { raw, .. }) if raw == "a"
        ));
    }

    #[test]
    fn associated_layers() {
        let master = Layer {
            layer_id: "m01".into(),
            ..Default::default()
        };
        assert!(master.is_master_layer());
        assert_eq!("m01", master.master_id());

        let brace = Layer {
            layer_id: "B1D2".into(),
            name: Some("{100}".to_string()),
            associated_master_id: Some("m01".into()),
            ..Default::default()
        };
        assert!(!brace.is_master_layer());
        assert_eq!("m01", brace.master_id());
    }

    #[test]
    fn legacy_values_are_listed() {
        let font = Font {
            disables_nice_names: Some(true),
            display_strings: Some(vec!["Hamburgefonstiv".to_string()]),
            ..Default::default()
        };
        let values: Vec<_> = FONT_LEGACY_KEYS
            .iter()
            .filter_map(|k| font.legacy_value(k).map(|v| (*k, v)))
            .collect();
        assert_eq!(
            vec![
                (
                    "DisplayStrings",
                    plist::Value::Array(vec!["Hamburgefonstiv".into()])
                ),
                ("disablesNiceNames", plist::Value::Boolean(true)),
            ],
            values
        );

        let master = FontMaster {
            weight_value: Some(700.0),
            ..Default::default()
        };
        assert_eq!(
            Some(plist::Value::Real(700.0)),
            master.legacy_value("weightValue")
        );
        assert_eq!(None, master.legacy_value("customValue"));
    }

    #[test]
    fn instance_family_name() {
        let mut instance = Instance::default();
        assert_eq!(None, instance.family_name());
        instance
            .custom_parameters
            .push(CustomParameter::new("familyName", "Foo Sans"));
        assert_eq!(Some("Foo Sans"), instance.family_name());
    }

    #[test]
    fn background_emptiness() {
        let mut background = LayerBackground::default();
        assert!(background.is_empty());
        background.anchors.push(Anchor::new("top", (0.0, 700.0)));
        assert!(!background.is_empty());
    }
}
