//! VRC `.sct2` sector files, kept as ordered raw-line sections so that everything not touched
//! by the diagram merge is written back verbatim.

pub mod classify;
pub mod labels;
pub mod write;

use std::io::{self, Write as _};
use std::path::Path;

use bevy_derive::{Deref, DerefMut};
use geo::Point;
use indexmap::IndexMap;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::colours::Colours;
use crate::{read_to_string, DegMinSec, DegMinSecExt as _, SourceEncoding};

use self::classify::{LineContent, LineState, SubsectionLine};
use self::write::SectorFileWriter;

#[derive(Parser)]
#[grammar = "pest/sct_line.pest"]
pub struct SctLineParser;

/// Subsection of `[SID]` new diagram categories are inserted after.
pub const AIRPORTS_SUBSECTION: &str = "(Airports)";
/// Dummy coordinates padding every sid/star subsection header.
pub const HEADER_PADDING: &str =
    "N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000";
const HEADER_NAME_WIDTH: usize = 27;

#[derive(Error, Debug)]
pub enum SctError {
    #[error("failed to parse coordinate: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("failed to read .sct2 file: {0}")]
    FileRead(#[from] io::Error),
    #[error("no (Airports) subsection in [SID]")]
    MissingAirportsSubsection,
}

pub type SctResult = Result<SectorFile, SctError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SectionName {
    Header,
    Colors,
    Info,
    Regions,
    LowAirway,
    HighAirway,
    Airport,
    Vor,
    Ndb,
    Runway,
    Fixes,
    Artcc,
    Labels,
    Sid,
    Star,
    ArtccHigh,
    ArtccLow,
    Geo,
}

impl SectionName {
    /// Every section, in the order they are written.
    pub const ALL: [Self; 18] = [
        Self::Header,
        Self::Colors,
        Self::Info,
        Self::Regions,
        Self::LowAirway,
        Self::HighAirway,
        Self::Airport,
        Self::Vor,
        Self::Ndb,
        Self::Runway,
        Self::Fixes,
        Self::Artcc,
        Self::Labels,
        Self::Sid,
        Self::Star,
        Self::ArtccHigh,
        Self::ArtccLow,
        Self::Geo,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Colors => "colors",
            Self::Info => "info",
            Self::Regions => "regions",
            Self::LowAirway => "low airway",
            Self::HighAirway => "high airway",
            Self::Airport => "airport",
            Self::Vor => "vor",
            Self::Ndb => "ndb",
            Self::Runway => "runway",
            Self::Fixes => "fixes",
            Self::Artcc => "artcc",
            Self::Labels => "labels",
            Self::Sid => "sid",
            Self::Star => "star",
            Self::ArtccHigh => "artcc high",
            Self::ArtccLow => "artcc low",
            Self::Geo => "geo",
        }
    }

    /// `[KEY]` as it opens the section
    pub fn tag(self) -> String {
        format!("[{}]", self.key().to_uppercase())
    }

    pub fn has_subsections(self) -> bool {
        matches!(self, Self::Sid | Self::Star)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subsection {
    pub name: String,
    /// header line first
    pub lines: Vec<String>,
}

impl Subsection {
    /// New subsection with a padded header line.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: vec![format!("{name:<HEADER_NAME_WIDTH$}{HEADER_PADDING}")],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Section {
    pub lines: Vec<String>,
    pub subsections: Vec<Subsection>,
}

/// ICAO -> airport reference point, from `[AIRPORT]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct AirportTable(IndexMap<String, Point>);

#[derive(Clone, Debug, Serialize)]
pub struct SectorFile {
    sections: IndexMap<SectionName, Section>,
    pub airports: AirportTable,
    pub colours: Colours,
    pub magnetic_variation: Option<f64>,
    pub encoding: SourceEncoding,
    airports_anchor: usize,
    inserted_subsections: usize,
}

fn parse_deg_min_sec(pair: Pair<Rule>) -> DegMinSec {
    let mut part = pair.into_inner();
    let sign = match part.next().unwrap().as_str() {
        "N" | "E" => 1.0,
        "S" | "W" => -1.0,
        _ => unreachable!(),
    };
    let degrees = part.next().unwrap().as_str().parse().unwrap();
    let minutes = part.next().unwrap().as_str().parse().unwrap();
    let seconds = part.next().unwrap().as_str().parse().unwrap();

    DegMinSec {
        sign,
        degrees,
        minutes,
        seconds,
    }
}

pub(crate) fn parse_coordinate_pair(pair: Pair<Rule>) -> Point {
    let mut coordinate = pair.into_inner();
    let lat = parse_deg_min_sec(coordinate.next().unwrap());
    let lng = parse_deg_min_sec(coordinate.next().unwrap());
    Point::from_deg_min_sec(lat, lng)
}

fn parse_token(rule: Rule, token: &str) -> Result<DegMinSec, SctError> {
    let part = SctLineParser::parse(rule, token)?
        .next()
        .unwrap()
        .into_inner()
        .next()
        .unwrap();
    Ok(parse_deg_min_sec(part))
}

/// Decodes `N047.26.59.681` / `W122.18.33.500` tokens into decimal degrees.
pub fn parse_coordinate(lat: &str, lng: &str) -> Result<Point, SctError> {
    Ok(Point::from_deg_min_sec(
        parse_token(Rule::lat_token, lat)?,
        parse_token(Rule::lng_token, lng)?,
    ))
}

impl SectorFile {
    fn empty(colours: Colours, encoding: SourceEncoding) -> Self {
        Self {
            sections: SectionName::ALL
                .iter()
                .map(|name| (*name, Section::default()))
                .collect(),
            airports: AirportTable::default(),
            colours,
            magnetic_variation: None,
            encoding,
            airports_anchor: 0,
            inserted_subsections: 0,
        }
    }

    pub fn parse(content: &[u8]) -> SctResult {
        Self::parse_with_colours(content, Colours::default())
    }

    pub fn parse_with_colours(content: &[u8], colours: Colours) -> SctResult {
        let (unparsed_file, encoding) = read_to_string(content)?;
        let mut sct = Self::empty(colours, encoding);
        let mut state = LineState::default();

        for line in unparsed_file.lines() {
            let (next, line_step) = classify::step(state, line);
            state = next;

            match line_step.content {
                LineContent::Airport { icao, coordinate } => {
                    sct.airports.insert(icao, coordinate);
                }
                LineContent::Colour(colour) => {
                    sct.colours.mark_used(&colour);
                }
                LineContent::Nothing => (),
            }
            if let Some(variation) = line_step.magnetic_variation {
                sct.magnetic_variation = Some(variation);
            }
            if let Some((name, value)) = &line_step.definition {
                sct.colours.define(name, value);
            }

            let section = sct.section_mut(line_step.section);
            match line_step.subsection {
                SubsectionLine::Opens(name) => {
                    debug!("{} subsection {name}", line_step.section.key());
                    section.subsections.push(Subsection {
                        name,
                        lines: vec![line.to_string()],
                    });
                }
                SubsectionLine::Continues => {
                    if let Some(subsection) = section.subsections.last_mut() {
                        subsection.lines.push(line.to_string());
                    }
                }
                SubsectionLine::Outside => (),
            }
            section.lines.push(line.to_string());
        }

        sct.airports_anchor = sct
            .section(SectionName::Sid)
            .and_then(|sid| {
                sid.subsections
                    .iter()
                    .position(|subsection| subsection.name == AIRPORTS_SUBSECTION)
            })
            .ok_or(SctError::MissingAirportsSubsection)?;

        Ok(sct)
    }

    pub fn from_path(path: &Path, colours: Colours) -> SctResult {
        Self::parse_with_colours(&fs_err::read(path)?, colours)
    }

    pub fn section(&self, name: SectionName) -> Option<&Section> {
        self.sections.get(&name)
    }

    pub fn section_mut(&mut self, name: SectionName) -> &mut Section {
        self.sections.entry(name).or_default()
    }

    /// Subsection names of `[SID]` in output order.
    pub fn sid_subsection_names(&self) -> Vec<&str> {
        self.section(SectionName::Sid)
            .map(|sid| {
                sid.subsections
                    .iter()
                    .map(|subsection| subsection.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `[SID]` subsection called `name`. A missing one is created right after
    /// `(Airports)` and any subsections created before it.
    pub fn sid_subsection_mut(&mut self, name: &str) -> &mut Subsection {
        let insert_at = self.airports_anchor + 1 + self.inserted_subsections;
        let sid = self.sections.entry(SectionName::Sid).or_default();
        let index = match sid
            .subsections
            .iter()
            .position(|subsection| subsection.name == name)
        {
            Some(index) => index,
            None => {
                debug!("new sid subsection {name}");
                let index = insert_at.min(sid.subsections.len());
                sid.subsections.insert(index, Subsection::new(name));
                self.inserted_subsections += 1;
                index
            }
        };
        &mut sid.subsections[index]
    }

    pub fn append_labels(&mut self, lines: impl IntoIterator<Item = String>) {
        self.section_mut(SectionName::Labels).lines.extend(lines);
    }

    pub fn writer<'a>(&'a self, version: &'a str) -> SectorFileWriter<'a> {
        SectorFileWriter::new(self, version)
    }

    /// Writes the file with `version` appended to the sector name in `[INFO]`.
    pub fn write(&self, path: &Path, version: &str) -> Result<(), SctError> {
        let contents = self.writer(version).to_string();
        let mut file = fs_err::File::create(path)?;
        file.write_all(&self.encoding.encode(&contents))?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{parse_coordinate, SctError, SectionName, SectorFile, AIRPORTS_SUBSECTION};

    pub const SCT: &str = "; ZSE test sector
; generated for tests

#define taxiway 16711680
#define COLOR_Old 1234

[INFO]
ZSE TEST
ZSE_CTR
KSEA
N047.26.59.681
W122.18.33.500
60
40
-16.0
1

[VOR]
SEA 116.800 N047.26.07.000 W122.18.34.000

[AIRPORT]
KSEA 119.900 N047.26.59.681 W122.18.33.500 D
KBFI 120.600 N047.31.48.000 W122.18.07.000 D

[RUNWAY]
16L 34R 163 343 N047.27.50.000 W122.18.28.000 N047.26.00.000 W122.18.27.000 KSEA

[LABELS]
\"SEA GATE A1\" N047.26.45.000 W122.18.10.000 TaxiwayLabel
\"BFI\" N047.31.48.000 W122.18.07.000 2345
\"FAR AWAY\" N047.40.00.000 W122.18.00.000 red
; comment stays

[SID]
========SIDs=========     N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000
 N047.00.00.000 W122.00.00.000 N047.01.00.000 W122.00.00.000 Blue
(Airports)                 N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000
;KSEA
 N047.27.50.000 W122.18.28.000 N047.26.00.000 W122.18.27.000 runway
======AIRSPACE=======     N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000
 N047.10.00.000 W122.10.00.000 N047.20.00.000 W122.10.00.000 classB

[STAR]
========SUAs=========     N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000
 N046.00.00.000 W121.00.00.000 N046.10.00.000 W121.00.00.000 COLOR_Old

[REGIONS]
apron N047.26.00.000 W122.18.00.000 ; terminal
      N047.26.10.000 W122.18.00.000
      N047.26.10.000 W122.18.10.000

[GEO]
N047.26.00.000 W122.18.00.000 N047.27.00.000 W122.18.00.000 Yellow
";

    #[test]
    fn test_parse_coordinate() {
        let coordinate = parse_coordinate("S033.56.46.000", "E151.10.38.000").unwrap();
        assert!((coordinate.y() + 33.946_111_111).abs() < 1e-8);
        assert!((coordinate.x() - 151.177_222_222).abs() < 1e-8);

        let southern = parse_coordinate("S000.30.00.000", "W000.15.00").unwrap();
        assert!((southern.y() + 0.5).abs() < 1e-12);
        assert!((southern.x() + 0.25).abs() < 1e-12);

        assert!(matches!(
            parse_coordinate("E047.26.59.681", "W122.18.33.500"),
            Err(SctError::Parse(_))
        ));
        assert!(parse_coordinate("N047.26", "W122.18.33.500").is_err());
    }

    #[test]
    fn test_sections() {
        let sct = SectorFile::parse(SCT.as_bytes()).unwrap();

        assert_eq_sorted!(
            sct.section(SectionName::Header).unwrap().lines,
            vec!["; ZSE test sector", "; generated for tests", ""]
        );
        assert_eq_sorted!(
            sct.section(SectionName::Colors).unwrap().lines,
            vec!["#define taxiway 16711680", "#define COLOR_Old 1234", ""]
        );
        assert_eq_sorted!(sct.section(SectionName::Info).unwrap().lines[1], "ZSE TEST");
        assert_eq_sorted!(
            sct.section(SectionName::Vor).unwrap().lines,
            vec!["[VOR]", "SEA 116.800 N047.26.07.000 W122.18.34.000", ""]
        );
        assert_eq_sorted!(sct.magnetic_variation, Some(-16.0));
        assert!(sct.section(SectionName::Artcc).unwrap().lines.is_empty());
    }

    #[test]
    fn test_airports() {
        let sct = SectorFile::parse(SCT.as_bytes()).unwrap();

        assert_eq_sorted!(
            sct.airports.keys().collect::<Vec<_>>(),
            vec!["KSEA", "KBFI"]
        );
        let ksea = sct.airports["KSEA"];
        assert!((ksea.y() - 47.449_911).abs() < 1e-6);
        assert!((ksea.x() + 122.309_305).abs() < 1e-6);
    }

    #[test]
    fn test_subsections() {
        let sct = SectorFile::parse(SCT.as_bytes()).unwrap();

        assert_eq_sorted!(
            sct.sid_subsection_names(),
            vec![
                "[SID]",
                "========SIDs=========",
                AIRPORTS_SUBSECTION,
                "======AIRSPACE======="
            ]
        );
        let sid = sct.section(SectionName::Sid).unwrap();
        assert_eq_sorted!(
            sid.subsections[2].lines,
            vec![
                "(Airports)                 N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000",
                ";KSEA",
                " N047.27.50.000 W122.18.28.000 N047.26.00.000 W122.18.27.000 runway",
            ]
        );
        let star = sct.section(SectionName::Star).unwrap();
        assert_eq_sorted!(
            star.subsections
                .iter()
                .map(|subsection| subsection.name.as_str())
                .collect::<Vec<_>>(),
            vec!["[STAR]", "========SUAs========="]
        );
        assert_eq_sorted!(star.lines.len(), 4);
    }

    #[test]
    fn test_used_colours_while_parsing() {
        let sct = SectorFile::parse(SCT.as_bytes()).unwrap();

        // labels are only accounted for when pruning
        assert_eq_sorted!(
            sct.colours
                .used()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
            vec!["blue", "runway", "classb", "color_old", "apron", "yellow"]
        );
    }

    #[test]
    fn test_new_subsections_after_airports() {
        let mut sct = SectorFile::parse(SCT.as_bytes()).unwrap();

        sct.sid_subsection_mut("(Current Diagrams)")
            .lines
            .push(";KSEA".to_string());
        sct.sid_subsection_mut("(Old Diagram REF)");
        sct.sid_subsection_mut("(Current Diagrams)")
            .lines
            .push(";KBFI".to_string());
        sct.sid_subsection_mut(AIRPORTS_SUBSECTION);

        assert_eq_sorted!(
            sct.sid_subsection_names(),
            vec![
                "[SID]",
                "========SIDs=========",
                AIRPORTS_SUBSECTION,
                "(Current Diagrams)",
                "(Old Diagram REF)",
                "======AIRSPACE======="
            ]
        );
        assert_eq_sorted!(
            sct.sid_subsection_mut("(Current Diagrams)").lines,
            vec![
                "(Current Diagrams)         N000.00.00.000 E000.00.00.000 N000.00.00.000 E000.00.00.000",
                ";KSEA",
                ";KBFI",
            ]
        );
    }

    #[test]
    fn test_missing_airports_subsection() {
        let sct = SCT.replace("(Airports)", "(Airfields)");
        assert!(matches!(
            SectorFile::parse(sct.as_bytes()),
            Err(SctError::MissingAirportsSubsection)
        ));
    }

    #[test]
    fn test_windows_1252() {
        let sct = SCT.replace("ZSE TEST", "ZSE M\u{fc}nchen");
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&sct);

        let sct = SectorFile::parse(&bytes).unwrap();
        assert_eq_sorted!(sct.encoding, crate::SourceEncoding::Windows1252);
        assert_eq_sorted!(
            sct.section(SectionName::Info).unwrap().lines[1],
            "ZSE M\u{fc}nchen"
        );
        assert_eq_sorted!(sct.encoding.encode("M\u{fc}nchen"), b"M\xfcnchen");
    }
}
