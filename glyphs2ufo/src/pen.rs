//! Point pens: the drawing interface between Glyphs geometry and UFO glyphs

use kurbo::{Affine, Point};

use crate::error::Error;

/// The role of an on-curve point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentType {
    Move,
    Line,
    Curve,
    QCurve,
}

/// Receives contours point by point, plus components.
///
/// Off-curve points are added with a `segment_type` of `None`.
pub trait PointPen {
    fn begin_path(&mut self);
    fn add_point(&mut self, pt: Point, segment_type: Option<SegmentType>, smooth: bool);
    fn end_path(&mut self);
    fn add_component(&mut self, base: &str, transform: Affine) -> Result<(), Error>;
}

/// A pen that appends contours and components to a norad glyph.
pub struct GlyphPointPen<'a> {
    glyph: &'a mut norad::Glyph,
    points: Option<Vec<norad::ContourPoint>>,
}

impl<'a> GlyphPointPen<'a> {
    pub fn new(glyph: &'a mut norad::Glyph) -> Self {
        GlyphPointPen {
            glyph,
            points: None,
        }
    }
}

pub(crate) fn to_norad_transform(transform: Affine) -> norad::AffineTransform {
    let [x_scale, xy_scale, yx_scale, y_scale, x_offset, y_offset] = transform.as_coeffs();
    norad::AffineTransform {
        x_scale,
        xy_scale,
        yx_scale,
        y_scale,
        x_offset,
        y_offset,
    }
}

pub(crate) fn to_kurbo_transform(transform: &norad::AffineTransform) -> Affine {
    Affine::new([
        transform.x_scale,
        transform.xy_scale,
        transform.yx_scale,
        transform.y_scale,
        transform.x_offset,
        transform.y_offset,
    ])
}

impl PointPen for GlyphPointPen<'_> {
    fn begin_path(&mut self) {
        debug_assert!(self.points.is_none(), "begin_path while a path is open");
        self.points = Some(Vec::new());
    }

    fn add_point(&mut self, pt: Point, segment_type: Option<SegmentType>, smooth: bool) {
        let typ = match segment_type {
            Some(SegmentType::Move) => norad::PointType::Move,
            Some(SegmentType::Line) => norad::PointType::Line,
            Some(SegmentType::Curve) => norad::PointType::Curve,
            Some(SegmentType::QCurve) => norad::PointType::QCurve,
            None => norad::PointType::OffCurve,
        };
        self.points
            .get_or_insert_with(Vec::new)
            .push(norad::ContourPoint::new(pt.x, pt.y, typ, smooth, None, None));
    }

    fn end_path(&mut self) {
        let points = self.points.take().unwrap_or_default();
        self.glyph.contours.push(norad::Contour::new(points, None));
    }

    fn add_component(&mut self, base: &str, transform: Affine) -> Result<(), Error> {
        let base = norad::Name::new(base).map_err(|e| Error::invalid_name(base, e))?;
        self.glyph.components.push(norad::Component::new(
            base,
            to_norad_transform(transform),
            None,
        ));
        Ok(())
    }
}

/// Records every call, for inspecting what was drawn
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingPen(pub Vec<String>);

#[cfg(test)]
impl PointPen for RecordingPen {
    fn begin_path(&mut self) {
        self.0.push("begin".to_string());
    }

    fn add_point(&mut self, pt: Point, segment_type: Option<SegmentType>, smooth: bool) {
        let typ = segment_type
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| "OffCurve".to_string());
        let smooth = if smooth { " smooth" } else { "" };
        self.0.push(format!("{typ} {},{}{smooth}", pt.x, pt.y));
    }

    fn end_path(&mut self) {
        self.0.push("end".to_string());
    }

    fn add_component(&mut self, base: &str, transform: Affine) -> Result<(), Error> {
        self.0
            .push(format!("component {base} {:?}", transform.as_coeffs()));
        Ok(())
    }
}
