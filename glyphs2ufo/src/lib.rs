//! Converts Glyphs font sources to UFO fonts, one per master.
//!
//! The entry point is [`to_ufos`]. It takes a [`glyphs_model::Font`] and the
//! glyph data used to look up categories and production names, and returns
//! in-memory [`norad::Font`]s; saving them is up to the caller.

pub mod anchors;
pub mod constants;
pub mod custom_params;
mod error;
pub mod features;
pub mod filters;
pub mod font;
pub mod glyph;
pub mod kerning;
pub mod pen;

#[cfg(test)]
mod test_util;

use bitflags::bitflags;
use glyphs_model::{glyphdata::GlyphData, Instance};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    constants::{GLYPHS_PREFIX, MIN_APP_VERSION, VARIATION_FONT_ORIGIN},
    custom_params::is_truthy,
    font::{build_ufos, filter_instances_by_family},
};

pub use error::Error;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Return the instances along with the UFOs
        const INCLUDE_INSTANCES = 0b0001;
        /// Copy anchors from components into the composites using them
        const PROPAGATE_ANCHORS = 0b0010;
        /// Return the source font instead of the UFOs
        const DEBUG = 0b0100;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::PROPAGATE_ANCHORS
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    /// Name the UFOs with this family instead of the source's, and only
    /// keep instances for it.
    pub family_name: Option<String>,
    pub flags: Flags,
}

impl Options {
    pub fn new(family_name: Option<String>, flags: Flags) -> Self {
        Options { family_name, flags }
    }
}

/// Instances to interpolate later, with the font-wide interpolation origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InstanceData {
    pub data: Vec<Instance>,
    #[serde(
        rename = "Variation Font Origin",
        skip_serializing_if = "Option::is_none"
    )]
    pub variation_font_origin: Option<plist::Value>,
}

#[derive(Debug)]
pub enum Output {
    Ufos(Vec<norad::Font>),
    WithInstances(Vec<norad::Font>, InstanceData),
    /// The source, as given; what [`Flags::DEBUG`] returns
    Debug(Box<glyphs_model::Font>),
}

impl Output {
    /// The UFOs, if any were returned
    pub fn ufos(&self) -> Option<&[norad::Font]> {
        match self {
            Output::Ufos(ufos) | Output::WithInstances(ufos, _) => Some(ufos),
            Output::Debug(_) => None,
        }
    }
}

/// Convert a Glyphs font into one UFO per master.
///
/// With a family name in `options` the UFOs use it, and instances are
/// limited to those whose `familyName` parameter matches it. When it is the
/// source family name, that means instances without the parameter.
pub fn to_ufos(
    font: &glyphs_model::Font,
    glyph_data: &GlyphData,
    options: &Options,
) -> Result<Output, Error> {
    if font.app_version.is_some_and(|v| v < MIN_APP_VERSION) {
        warn!(
            "This Glyphs source was generated with an outdated version of Glyphs. The resulting UFOs may be incorrect."
        );
    }

    let (family_name, instance_family) = match options.family_name.as_deref() {
        None => (font.family_name.as_str(), None),
        Some(family) if family == font.family_name => (family, Some(None)),
        Some(family) => (family, Some(Some(family))),
    };

    let ufos = build_ufos(
        font,
        glyph_data,
        family_name,
        options.flags.contains(Flags::PROPAGATE_ANCHORS),
    )?;
    debug!("Built {} UFOs for '{family_name}'", ufos.len());

    let instances = match instance_family {
        None => font.instances.clone(),
        Some(family) => filter_instances_by_family(&font.instances, family)
            .cloned()
            .collect(),
    };
    // a font-wide parameter, so every UFO has the same value
    let variation_font_origin = ufos
        .first()
        .and_then(|ufo| {
            ufo.lib
                .get(&format!("{GLYPHS_PREFIX}{VARIATION_FONT_ORIGIN}"))
        })
        .filter(|v| is_truthy(v))
        .cloned();

    if options.flags.contains(Flags::DEBUG) {
        return Ok(Output::Debug(Box::new(font.clone())));
    }
    if options.flags.contains(Flags::INCLUDE_INSTANCES) {
        return Ok(Output::WithInstances(
            ufos,
            InstanceData {
                data: instances,
                variation_font_origin,
            },
        ));
    }
    Ok(Output::Ufos(ufos))
}

#[cfg(test)]
mod tests {
    use glyphs_model::CustomParameter;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{glyph_data, two_master_font};

    fn instance(name: &str, family: Option<&str>) -> Instance {
        Instance {
            name: name.to_string(),
            exports: true,
            custom_parameters: family
                .map(|f| vec![CustomParameter::new("familyName", f)])
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    fn font_with_instances() -> glyphs_model::Font {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut font = two_master_font();
        font.instances = vec![
            instance("Regular", None),
            instance("Display Regular", Some("Test Sans Display")),
            instance("Bold", None),
        ];
        font
    }

    fn instance_names(output: &Output) -> Vec<&str> {
        match output {
            Output::WithInstances(_, instances) => {
                instances.data.iter().map(|i| i.name.as_str()).collect()
            }
            _ => panic!("no instances in {output:?}"),
        }
    }

    #[test]
    fn ufos_only_by_default() {
        let output = to_ufos(&font_with_instances(), &glyph_data(), &Options::default()).unwrap();
        assert!(matches!(output, Output::Ufos(ref ufos) if ufos.len() == 2));
    }

    #[test]
    fn all_instances_without_family_name() {
        let options = Options::new(None, Flags::INCLUDE_INSTANCES);
        let output = to_ufos(&font_with_instances(), &glyph_data(), &options).unwrap();
        assert_eq!(
            vec!["Regular", "Display Regular", "Bold"],
            instance_names(&output)
        );
    }

    #[test]
    fn source_family_name_keeps_unnamed_instances() {
        let options = Options::new(Some("Test Sans".to_string()), Flags::INCLUDE_INSTANCES);
        let output = to_ufos(&font_with_instances(), &glyph_data(), &options).unwrap();
        assert_eq!(vec!["Regular", "Bold"], instance_names(&output));
    }

    #[test]
    fn other_family_name_renames_ufos() {
        let options = Options::new(
            Some("Test Sans Display".to_string()),
            Flags::INCLUDE_INSTANCES,
        );
        let output = to_ufos(&font_with_instances(), &glyph_data(), &options).unwrap();
        assert_eq!(vec!["Display Regular"], instance_names(&output));
        let ufos = output.ufos().unwrap();
        assert_eq!(
            Some("Test Sans Display"),
            ufos[0].font_info.family_name.as_deref()
        );
    }

    #[test]
    fn variation_font_origin_is_surfaced() {
        let mut font = font_with_instances();
        font.custom_parameters
            .push(CustomParameter::new("Variation Font Origin", "m02"));
        let options = Options::new(None, Flags::INCLUDE_INSTANCES);
        let Output::WithInstances(_, instances) =
            to_ufos(&font, &glyph_data(), &options).unwrap()
        else {
            panic!("expected instances");
        };
        assert_eq!(
            Some(plist::Value::String("m02".to_string())),
            instances.variation_font_origin
        );
        let json = serde_json::to_value(&instances).unwrap();
        assert_eq!(
            Some("m02"),
            json.get("Variation Font Origin").and_then(|v| v.as_str())
        );
    }

    #[test]
    fn no_variation_font_origin_is_not_serialized() {
        let options = Options::new(None, Flags::INCLUDE_INSTANCES);
        let Output::WithInstances(_, instances) =
            to_ufos(&font_with_instances(), &glyph_data(), &options).unwrap()
        else {
            panic!("expected instances");
        };
        let json = serde_json::to_value(&instances).unwrap();
        assert!(json.get("Variation Font Origin").is_none());
        assert_eq!(3, json["data"].as_array().map(|a| a.len()).unwrap_or_default());
    }

    #[test]
    fn debug_returns_the_source() {
        let font = font_with_instances();
        let options = Options::new(None, Flags::DEBUG | Flags::INCLUDE_INSTANCES);
        let output = to_ufos(&font, &glyph_data(), &options).unwrap();
        match output {
            Output::Debug(source) => assert_eq!(font, *source),
            other => panic!("expected the source, got {other:?}"),
        }
    }

    #[test]
    fn outdated_sources_still_convert() {
        let mut font = font_with_instances();
        font.app_version = Some(700);
        let output = to_ufos(&font, &glyph_data(), &Options::default()).unwrap();
        assert_eq!(2, output.ufos().map(|u| u.len()).unwrap_or_default());
    }

    #[test]
    fn anchors_propagate_unless_disabled() {
        let mut font = font_with_instances();
        font.glyphs[0].layers[0]
            .anchors
            .push(glyphs_model::Anchor::new("top", (250.0, 500.0)));
        let mut composite = crate::test_util::glyph("aa", &["m01", "m02"]);
        for layer in composite.layers.iter_mut() {
            layer.paths.clear();
            layer.components.push(glyphs_model::Component::new(
                "a",
                kurbo::Affine::IDENTITY,
            ));
        }
        font.glyphs.push(composite);

        let anchor_count = |flags: Flags| {
            let output = to_ufos(&font, &glyph_data(), &Options::new(None, flags)).unwrap();
            output.ufos().unwrap()[0]
                .default_layer()
                .get_glyph("aa")
                .map(|g| g.anchors.len())
                .unwrap_or_default()
        };
        assert_eq!(1, anchor_count(Flags::default()));
        assert_eq!(0, anchor_count(Flags::empty()));
    }
}
