//! Text drawn as line segments, for labels the sector file cannot show as plain labels.
//!
//! Glyph outlines are in thousandths of an em, `y` pointing up. A `scale` of 1 makes 1000 units
//! one sixtieth of a degree (one nautical mile), the glyph baseline running along `heading`.

use geo::Point;
use tracing::warn;

use super::shapes::Segment;
use crate::geodesy::destination;

/// Font units per degree at a scale of 1.
const UNITS_PER_DEGREE: f64 = 60_000.0;
const ADVANCE_FACTOR: f64 = 1.4;
/// Degrees advanced for a space or an empty glyph at a scale of 1.
const DEFAULT_ADVANCE: f64 = 1.0 / 150.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<(f64, f64)>,
    /// connect the last point back to the first
    pub closed: bool,
}

/// Source of glyph outlines.
pub trait GlyphOutlines {
    /// Outline of `c`, `None` when the font has no glyph for it.
    fn outline(&self, c: char) -> Option<Vec<Contour>>;
}

/// Used when no font is configured: every glyph is missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOutlines;

impl GlyphOutlines for NoOutlines {
    fn outline(&self, _: char) -> Option<Vec<Contour>> {
        None
    }
}

fn contour_segments(contour: &Contour) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    let closing = match (contour.closed, contour.points.first(), contour.points.last()) {
        (true, Some(first), Some(last)) if contour.points.len() > 2 && first != last => {
            Some((*last, *first))
        }
        _ => None,
    };
    contour
        .points
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .chain(closing)
}

/// Places a font point relative to `anchor`: `x` along `heading`, `y` to its left.
fn place(anchor: Point, (x, y): (f64, f64), unit_nm: f64, heading: f64) -> Point {
    let distance = x.hypot(y) * unit_nm;
    if distance == 0.0 {
        return anchor;
    }
    let bearing = x.atan2(y).to_degrees() + heading - 90.0;
    destination(anchor, bearing.to_radians(), distance)
}

/// Segments drawing `text` from `anchor` along `heading` (degrees true).
pub fn layout_text(
    glyphs: &dyn GlyphOutlines,
    anchor: Point,
    text: &str,
    scale: f64,
    heading: f64,
) -> Vec<Segment> {
    let unit_nm = scale / UNITS_PER_DEGREE * 60.0;
    let default_advance_nm = scale * DEFAULT_ADVANCE * 60.0;
    let mut segments = vec![];
    let mut origin = anchor;

    for c in text.chars() {
        let mut advance_nm = default_advance_nm;
        if !c.is_whitespace() {
            match glyphs.outline(c) {
                Some(contours) => {
                    for contour in &contours {
                        segments.extend(contour_segments(contour).map(|(from, to)| {
                            (
                                place(origin, from, unit_nm, heading),
                                place(origin, to, unit_nm, heading),
                            )
                        }));
                    }
                    let (min, max) = contours
                        .iter()
                        .flat_map(|contour| &contour.points)
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), (x, _)| {
                            (min.min(*x), max.max(*x))
                        });
                    let width = max - min;
                    if width > 0.0 {
                        advance_nm = ADVANCE_FACTOR * width * unit_nm;
                    }
                }
                None => warn!("No outline for {c:?} in {text:?}"),
            }
        }
        origin = destination(origin, heading.to_radians(), advance_nm);
    }

    segments
}
