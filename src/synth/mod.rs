//! Folds airport diagrams into a sector file: lines and plotted text go into `[SID]`
//! subsections named after their category, labels are collected for `[LABELS]`.

pub mod font;
pub mod shapes;
pub mod text;

use geo::Point;
use tracing::{debug, info_span, warn};

use self::shapes::{circle, dashes, polyline, Segment};
use self::text::{layout_text, GlyphOutlines};
use crate::diagram::{AirportDiagram, Draw, LabelItem, LineItem, DEFAULT_DASH_FEET};
use crate::geodesy::{distance_nm, feet_to_nm, initial_bearing};
use crate::sct::SectorFile;
use crate::DegMinSecExt as _;

/// Subsection receiving taxiway and runway labels drawn as text.
pub const TAXIWAYS_SUBSECTION: &str = "(Taxiways)";
pub const DEFAULT_TAXIWAY_LABEL_COLOUR: &str = "twyrwy_labels";
/// Text scale of plotted labels.
pub const LABEL_PLOT_SCALE: f64 = 0.01;

/// What a merge leaves to do for the labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOutcome {
    /// airports that got literal labels, existing labels around them are stale
    pub labelled_airports: Vec<String>,
    /// label lines to append to `[LABELS]`, grouped per airport
    pub labels: Vec<String>,
}

pub fn category_subsection(category: &str) -> String {
    format!("({category})")
}

fn segment_line((from, to): Segment, colour: &str) -> String {
    format!(
        " {} {} {colour}",
        from.deg_min_sec_fmt(),
        to.deg_min_sec_fmt()
    )
}

fn label_line(label: &LabelItem, colour: &str) -> String {
    format!(
        "\"{}\" {} {colour}",
        label.name,
        label.coordinate.deg_min_sec_fmt()
    )
}

fn label_text(
    glyphs: &dyn GlyphOutlines,
    label: &LabelItem,
    heading: f64,
    colour: &str,
) -> Vec<String> {
    layout_text(
        glyphs,
        label.coordinate,
        &label.name,
        LABEL_PLOT_SCALE,
        heading,
    )
    .into_iter()
    .map(|segment| segment_line(segment, colour))
    .collect()
}

fn endpoints(line: &LineItem) -> Option<(Point, Point)> {
    match *line.coordinates.as_slice() {
        [start, end, ..] => Some((start, end)),
        _ => {
            warn!("{:?} needs two coordinates, skipping", line.name);
            None
        }
    }
}

fn draw_line(line: &LineItem, glyphs: &dyn GlyphOutlines) -> Vec<Segment> {
    if line.plot {
        let Some((start, end)) = endpoints(line) else {
            return vec![];
        };
        let scale = distance_nm(start, end);
        if scale == 0.0 {
            warn!("Skipping text {:?} along a path without length", line.name);
            return vec![];
        }
        return layout_text(glyphs, start, &line.name, scale, initial_bearing(start, end));
    }

    match line.draw {
        Draw::Plain => polyline(&line.coordinates),
        Draw::Dashed(spacing) => endpoints(line)
            .map(|(start, end)| {
                dashes(start, end, feet_to_nm(spacing.unwrap_or(DEFAULT_DASH_FEET)))
            })
            .unwrap_or_default(),
        Draw::Circle => endpoints(line)
            .map(|(centre, edge)| circle(centre, edge))
            .unwrap_or_default(),
    }
}

impl SectorFile {
    /// Adds `diagrams` to `[SID]`. Labels are returned rather than added, so that existing
    /// labels can be pruned first.
    pub fn merge_diagrams<'d>(
        &mut self,
        diagrams: impl IntoIterator<Item = (&'d str, &'d AirportDiagram)>,
        glyphs: &dyn GlyphOutlines,
        taxiway_label_colour: &str,
    ) -> MergeOutcome {
        // labels read along magnetic east
        let label_heading = 90.0 - self.magnetic_variation.unwrap_or_default();
        let mut outcome = MergeOutcome::default();

        for (icao, diagram) in diagrams {
            let _span = info_span!("diagram", airport = icao).entered();
            let mut labels = vec![];
            let mut taxiways = vec![];

            for (category, content) in diagram.iter() {
                let mut lines = vec![format!(";{icao}")];

                for (colour, items) in &content.lines {
                    self.colours.mark_used(colour);
                    for item in items {
                        lines.extend(
                            draw_line(item, glyphs)
                                .into_iter()
                                .map(|segment| segment_line(segment, colour)),
                        );
                    }
                }

                for (colour, items) in &content.labels {
                    self.colours.mark_used(colour);
                    for label in items {
                        if label.plot {
                            lines.extend(label_text(glyphs, label, label_heading, colour));
                            continue;
                        }
                        labels.push(label_line(label, colour));
                        if colour.eq_ignore_ascii_case(taxiway_label_colour) {
                            taxiways.extend(label_text(glyphs, label, label_heading, colour));
                        }
                    }
                }

                debug!("{} lines for {category}", lines.len() - 1);
                self.sid_subsection_mut(&category_subsection(category))
                    .lines
                    .extend(lines);
            }

            if !taxiways.is_empty() {
                let subsection = self.sid_subsection_mut(TAXIWAYS_SUBSECTION);
                subsection.lines.push(format!(";{icao}"));
                subsection.lines.extend(taxiways);
            }
            if !labels.is_empty() {
                debug!("{} labels", labels.len());
                outcome.labels.push(String::new());
                outcome.labels.push(format!(";{icao}"));
                outcome.labels.extend(labels);
                outcome.labelled_airports.push(icao.to_string());
            }
        }

        outcome
    }
}
