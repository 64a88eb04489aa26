use std::io;
use std::path::Path;

use ab_glyph::{point, Font, FontVec, OutlineCurve, Point as GlyphPoint};
use thiserror::Error;
use tracing::info;

use super::text::{Contour, GlyphOutlines};

/// Straight pieces each outline curve is flattened into.
const CURVE_STEPS: usize = 4;
const UNITS_PER_EM: f32 = 1000.0;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font: {0}")]
    FileRead(#[from] io::Error),
    #[error("invalid font: {0}")]
    InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// Glyph outlines of a TrueType/OpenType font.
pub struct FontOutlines {
    font: FontVec,
    /// font units to thousandths of an em
    factor: f32,
}

impl FontOutlines {
    pub fn from_vec(data: Vec<u8>) -> Result<Self, FontError> {
        let font = FontVec::try_from_vec(data)?;
        let factor = UNITS_PER_EM / font.units_per_em().unwrap_or(UNITS_PER_EM);
        Ok(Self { font, factor })
    }

    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        info!("Loading font {}", path.display());
        Self::from_vec(fs_err::read(path)?)
    }

    fn scaled(&self, point: GlyphPoint) -> (f64, f64) {
        (
            f64::from(point.x * self.factor),
            f64::from(point.y * self.factor),
        )
    }
}

/// Sum of `points` scaled by `weights`, component by component.
fn weighted(points: &[GlyphPoint], weights: &[f32]) -> GlyphPoint {
    let (x, y) = points
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(x, y), (p, w)| (x + p.x * w, y + p.y * w));
    point(x, y)
}

fn quad(p0: GlyphPoint, p1: GlyphPoint, p2: GlyphPoint, t: f32) -> GlyphPoint {
    let mt = 1.0 - t;
    weighted(&[p0, p1, p2], &[mt * mt, 2.0 * mt * t, t * t])
}

fn cubic(p0: GlyphPoint, p1: GlyphPoint, p2: GlyphPoint, p3: GlyphPoint, t: f32) -> GlyphPoint {
    let mt = 1.0 - t;
    weighted(
        &[p0, p1, p2, p3],
        &[mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t],
    )
}

/// Start point and the flattened points following it.
fn flatten(curve: &OutlineCurve) -> (GlyphPoint, Vec<GlyphPoint>) {
    let steps = (1..=CURVE_STEPS).map(|step| step as f32 / CURVE_STEPS as f32);
    match *curve {
        OutlineCurve::Line(p0, p1) => (p0, vec![p1]),
        OutlineCurve::Quad(p0, p1, p2) => (p0, steps.map(|t| quad(p0, p1, p2, t)).collect()),
        OutlineCurve::Cubic(p0, p1, p2, p3) => {
            (p0, steps.map(|t| cubic(p0, p1, p2, p3, t)).collect())
        }
    }
}

impl GlyphOutlines for FontOutlines {
    fn outline(&self, c: char) -> Option<Vec<Contour>> {
        let id = self.font.glyph_id(c);
        // .notdef
        if id.0 == 0 {
            return None;
        }
        let outline = self.font.outline(id)?;

        let mut contours = Vec::<Contour>::new();
        let mut last = None;
        for curve in &outline.curves {
            let (start, points) = flatten(curve);
            let start = self.scaled(start);
            // a curve not continuing the previous one opens a new contour
            if last != Some(start) {
                contours.push(Contour {
                    points: vec![start],
                    closed: true,
                });
            }
            if let Some(contour) = contours.last_mut() {
                contour
                    .points
                    .extend(points.into_iter().map(|point| self.scaled(point)));
                last = contour.points.last().copied();
            }
        }

        Some(contours)
    }
}
