//! Single-line rules of the sector file reader. Each rule looks at one raw line and, where it
//! matters, the section the reader was in before the line was seen.

use geo::Point;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::{parse_coordinate, SectionName};

/// 1-indexed line within `[INFO]` (header excluded) holding the magnetic variation
pub const MAGNETIC_VARIATION_LINE: usize = 8;

const SUBSECTION_NAME_WIDTH: usize = 26;

static COORDINATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[NS]\d{3}").unwrap());

/// Reader position: the section, and within sid/star whether a subsection is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineState {
    pub section: SectionName,
    /// lines belong to the last subsection of `section`
    pub in_subsection: bool,
    pub info_lines: usize,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            section: SectionName::Header,
            in_subsection: false,
            info_lines: 0,
        }
    }
}

/// Where a sid/star line goes besides the section itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubsectionLine {
    Opens(String),
    Continues,
    Outside,
}

/// Everything one line changes in the sector file being read.
#[derive(Clone, Debug, PartialEq)]
pub struct LineStep {
    /// the section the line is stored in
    pub section: SectionName,
    /// content read in the section the reader was in before the line
    pub content: LineContent,
    pub definition: Option<(String, String)>,
    pub magnetic_variation: Option<f64>,
    pub subsection: SubsectionLine,
}

/// Advances the reader by one line.
pub fn step(mut state: LineState, line: &str) -> (LineState, LineStep) {
    let content = content(state.section, line);

    let mut variation = None;
    if state.section == SectionName::Info {
        state.info_lines += 1;
        if state.info_lines == MAGNETIC_VARIATION_LINE {
            variation = magnetic_variation(line);
        }
    }

    let mut definition = None;
    if let Some(next) = section_transition(line) {
        if next == SectionName::Colors && line.starts_with("#define") {
            definition =
                colour_definition(line).map(|(name, value)| (name.to_string(), value.to_string()));
        } else {
            state.in_subsection = false;
        }
        state.section = next;
    }

    let subsection = if !state.section.has_subsections() {
        SubsectionLine::Outside
    } else if let Some(name) = subsection_header(line) {
        state.in_subsection = true;
        SubsectionLine::Opens(name)
    } else if state.in_subsection {
        SubsectionLine::Continues
    } else {
        SubsectionLine::Outside
    };

    (
        state,
        LineStep {
            section: state.section,
            content,
            definition,
            magnetic_variation: variation,
            subsection,
        },
    )
}

/// What a line tells us about the file besides its own text.
#[derive(Clone, Debug, PartialEq)]
pub enum LineContent {
    Airport { icao: String, coordinate: Point },
    Colour(String),
    Nothing,
}

/// Section a line switches to, if it is a `#define` or a `[SECTION]` header.
pub fn section_transition(line: &str) -> Option<SectionName> {
    if line.starts_with("#define") {
        return Some(SectionName::Colors);
    }
    if !line.starts_with('[') {
        return None;
    }
    let upper = line.to_uppercase();
    SectionName::ALL
        .iter()
        .find(|name| upper.starts_with(&name.tag()))
        .copied()
}

/// `#define <name> <value>`
pub fn colour_definition(line: &str) -> Option<(&str, &str)> {
    let mut fields = line
        .split(';')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .skip(1);
    fields.next().zip(fields.next())
}

/// Name of the sid/star subsection a line opens. Anything not starting with whitespace or a
/// comment is a subsection header, named by its first 26 columns.
pub fn subsection_header(line: &str) -> Option<String> {
    match line.chars().next() {
        None | Some(' ' | '\t' | ';') => None,
        Some(_) => Some(
            line.chars()
                .take(SUBSECTION_NAME_WIDTH)
                .collect::<String>()
                .trim()
                .to_string(),
        ),
    }
}

fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or_default()
}

/// Airport coordinates and colour usage, keyed on the section the line belongs to.
pub fn content(section: SectionName, line: &str) -> LineContent {
    match section {
        SectionName::Airport => {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() < 2 || fields[0].starts_with(';') {
                return LineContent::Nothing;
            }
            match fields
                .get(2)
                .zip(fields.get(3))
                .map(|(lat, lng)| parse_coordinate(lat, lng))
            {
                Some(Ok(coordinate)) => LineContent::Airport {
                    icao: fields[0].to_string(),
                    coordinate,
                },
                Some(Err(e)) => {
                    warn!("Could not parse airport {}: {e}", fields[0]);
                    LineContent::Nothing
                }
                None => {
                    warn!("Airport line without coordinates: {line}");
                    LineContent::Nothing
                }
            }
        }
        SectionName::Regions => {
            let fields = strip_comment(line).split_whitespace().collect::<Vec<_>>();
            if fields.len() > 2
                && !COORDINATE_RE.is_match(fields[0])
                && !fields[0].eq_ignore_ascii_case("REGIONNAME")
            {
                LineContent::Colour(fields[0].to_lowercase())
            } else {
                LineContent::Nothing
            }
        }
        _ => {
            let fields = strip_comment(line).split_whitespace().collect::<Vec<_>>();
            if fields.len() >= 5 && COORDINATE_RE.is_match(fields[0]) {
                LineContent::Colour(fields[4].to_lowercase())
            } else {
                LineContent::Nothing
            }
        }
    }
}

pub fn magnetic_variation(line: &str) -> Option<f64> {
    let value = strip_comment(line).trim();
    match value.parse() {
        Ok(variation) => Some(variation),
        Err(e) => {
            warn!("Could not parse magnetic variation {value:?}: {e}");
            None
        }
    }
}
