use geo::Point;
use pest::Parser as _;
use tracing::{debug, warn};

use super::{parse_coordinate_pair, Rule, SctLineParser, SectionName, SectorFile};
use crate::geodesy::distance_nm;

/// Default radius around a newly labelled airport in which existing labels are dropped.
pub const DEFAULT_PRUNE_RADIUS_NM: f64 = 3.0;

/// `"<name>" <lat> <lng> <colour>`
#[derive(Clone, Debug, PartialEq)]
pub struct LabelLine {
    pub name: String,
    pub coordinate: Point,
    pub colour: String,
}

/// Parses a literal label line. Anything else (comments, blank lines, the section header) is
/// `None`; a line that starts like a label but does not parse is reported.
pub fn parse_label(line: &str) -> Option<LabelLine> {
    let label = match SctLineParser::parse(Rule::label, line) {
        Ok(mut pairs) => pairs.next()?,
        Err(e) => {
            if line.starts_with('"') {
                warn!("Could not parse label {line:?}: {e}");
            }
            return None;
        }
    };

    let mut name = None;
    let mut coordinate = None;
    let mut colour = None;
    for pair in label.into_inner() {
        match pair.as_rule() {
            Rule::quoted_name => {
                name = pair.into_inner().next().map(|name| name.as_str().to_string());
            }
            Rule::coordinate => coordinate = Some(parse_coordinate_pair(pair)),
            Rule::colour => colour = Some(pair.as_str().to_string()),
            _ => (),
        }
    }

    Some(LabelLine {
        name: name?,
        coordinate: coordinate?,
        colour: colour?,
    })
}

impl SectorFile {
    /// Drops existing labels closer than `radius_nm` to any of `airports` and marks the colours
    /// of the remaining ones as used. Returns the number of dropped labels.
    pub fn prune_labels(&mut self, airports: &[String], radius_nm: f64) -> usize {
        let centres = airports
            .iter()
            .filter_map(|icao| {
                let centre = self.airports.get(icao).copied();
                if let Some(centre) = centre {
                    debug!("pruning labels around {icao}: {:?}", centre.x_y());
                } else {
                    warn!("No coordinates for {icao}, its labels are not pruned");
                }
                centre
            })
            .collect::<Vec<_>>();

        let lines = std::mem::take(&mut self.section_mut(SectionName::Labels).lines);
        let mut kept = Vec::with_capacity(lines.len());
        let mut pruned = 0;
        for line in lines {
            if let Some(label) = parse_label(&line) {
                if centres
                    .iter()
                    .any(|centre| distance_nm(*centre, label.coordinate) < radius_nm)
                {
                    pruned += 1;
                    continue;
                }
                self.colours.mark_used(&label.colour);
            }
            kept.push(line);
        }
        self.section_mut(SectionName::Labels).lines = kept;

        pruned
    }
}
