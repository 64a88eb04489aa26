//! Diagram archives: a KMZ holding `doc.kml`, laid out as
//! `Document > Folder > Folder(category) > Folder(airport) > Folder(colour) > Placemark`.

use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use geo::{point, Point};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::{DiagramError, Diagrams, LabelItem, LineItem};

const KML_ENTRY: &str = "doc.kml";

#[derive(Clone, Debug, Default, PartialEq)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.trim())
    }

    /// Follows `path` downwards, yielding every element at its end.
    fn descendants<'a>(&'a self, path: &'a [&'a str]) -> Box<dyn Iterator<Item = &'a Element> + 'a> {
        match path.split_first() {
            None => Box::new(std::iter::once(self)),
            Some((first, rest)) => Box::new(
                self.children(first)
                    .flat_map(move |child| child.descendants(rest)),
            ),
        }
    }
}

fn local_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn read_element<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    name: String,
    empty: bool,
) -> Result<Element, DiagramError> {
    let mut element = Element {
        name,
        ..Element::default()
    };
    if empty {
        return Ok(element);
    }

    loop {
        buf.clear();
        let child = match reader.read_event_into(buf)? {
            Event::Start(start) => Some((local_name(&start), false)),
            Event::Empty(start) => Some((local_name(&start), true)),
            Event::Text(text) => {
                element.text.push_str(&text.unescape()?);
                None
            }
            Event::CData(data) => {
                element.text.push_str(&String::from_utf8_lossy(&data));
                None
            }
            Event::End(_) => return Ok(element),
            Event::Eof => return Err(DiagramError::UnexpectedEnd(element.name)),
            _ => None,
        };
        if let Some((name, empty)) = child {
            element.children.push(read_element(reader, buf, name, empty)?);
        }
    }
}

fn read_document<R: BufRead>(reader: R) -> Result<Element, DiagramError> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let root = match reader.read_event_into(&mut buf)? {
            Event::Start(start) => Some((local_name(&start), false)),
            Event::Empty(start) => Some((local_name(&start), true)),
            Event::Eof => return Err(DiagramError::UnexpectedEnd("kml".to_string())),
            _ => None,
        };
        if let Some((name, empty)) = root {
            return read_element(&mut reader, &mut buf, name, empty);
        }
    }
}

/// `lon,lat[,alt]` tuples separated by whitespace. Tuples with less than two fields are skipped.
fn parse_coordinates(text: &str) -> Result<Vec<Point>, DiagramError> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let mut fields = tuple.split(',');
            let lng = fields.next()?;
            let lat = fields.next()?;
            Some(
                lng.parse::<f64>()
                    .and_then(|lng| lat.parse::<f64>().map(|lat| point! { x: lng, y: lat }))
                    .map_err(|_| DiagramError::InvalidCoordinate(tuple.to_string())),
            )
        })
        .collect()
}

fn read_placemark(
    diagrams: &mut Diagrams,
    placemark: &Element,
    (airport, category, colour): (&str, &str, &str),
) -> Result<(), DiagramError> {
    let name = placemark.child_text("name").unwrap_or_default();
    let description = placemark.child_text("description").unwrap_or_default();

    for coordinates in placemark.descendants(&["Point", "coordinates"]) {
        match parse_coordinates(&coordinates.text)?.first() {
            Some(coordinate) => diagrams.add_label(
                airport,
                category,
                colour,
                LabelItem::new(name, *coordinate, description),
            ),
            None => warn!("Point {name:?} at {airport} without coordinates"),
        }
    }

    let lines = placemark.descendants(&["LineString", "coordinates"]).chain(
        placemark.descendants(&["Polygon", "outerBoundaryIs", "LinearRing", "coordinates"]),
    );
    for coordinates in lines {
        diagrams.add_line(
            airport,
            category,
            colour,
            LineItem::new(name, parse_coordinates(&coordinates.text)?, description),
        );
    }

    Ok(())
}

/// Reads the diagram folders of a KML document.
pub fn parse_kml<R: BufRead>(reader: R) -> Result<Diagrams, DiagramError> {
    let root = read_document(reader)?;
    let mut diagrams = Diagrams::default();

    for category in root.descendants(&["Document", "Folder", "Folder"]) {
        let Some(category_name) = category.child_text("name") else {
            warn!("Skipping category folder without a name");
            continue;
        };
        debug!("category {category_name}");

        for airport in category.children("Folder") {
            let Some(icao) = airport.child_text("name") else {
                warn!("Skipping airport folder without a name in {category_name}");
                continue;
            };
            debug!("airport {icao}");

            for colour in airport.children("Folder") {
                let Some(colour_name) = colour.child_text("name") else {
                    warn!("Skipping colour folder without a name at {icao}");
                    continue;
                };
                for placemark in colour.children("Placemark") {
                    read_placemark(
                        &mut diagrams,
                        placemark,
                        (icao, category_name, colour_name),
                    )?;
                }
            }
        }
    }

    Ok(diagrams)
}

/// Reads `doc.kml` out of a KMZ archive.
pub fn read_kmz_from<R: Read + Seek>(archive: R) -> Result<Diagrams, DiagramError> {
    let mut archive = ZipArchive::new(archive)?;
    let kml = archive.by_name(KML_ENTRY)?;
    parse_kml(BufReader::new(kml))
}

pub fn read_kmz(path: &Path) -> Result<Diagrams, DiagramError> {
    info!("Reading airport diagrams from {}", path.display());
    let diagrams = read_kmz_from(BufReader::new(fs_err::File::open(path)?))?;
    info!("{} airports with diagrams", diagrams.len());
    Ok(diagrams)
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Write as _};

    use pretty_assertions_sorted::assert_eq_sorted;
    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    use super::{parse_coordinates, parse_kml, read_kmz_from};
    use crate::diagram::{DiagramError, Draw};

    const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
  <name>ZSE Airport Diagrams.kmz</name>
  <Folder>
    <name>ZSE Airport Diagrams</name>
    <Folder>
      <name>Current Diagrams</name>
      <Folder>
        <name>KSEA</name>
        <Folder>
          <name>taxiway</name>
          <Placemark>
            <name>Taxiway A</name>
            <LineString>
              <coordinates>
                -122.3,47.44,0 -122.301,47.441,0
                -122.302,47.442,0
              </coordinates>
            </LineString>
          </Placemark>
          <Placemark>
            <name>dashed_30</name>
            <description> hold short </description>
            <LineString><coordinates>-122.3,47.44 -122.3,47.45</coordinates></LineString>
          </Placemark>
        </Folder>
        <Folder>
          <name>twyrwy_labels</name>
          <Placemark>
            <name>A &amp; B</name>
            <Point><coordinates>-122.31,47.45,0</coordinates></Point>
          </Placemark>
          <Placemark>
            <name>16L</name>
            <description><![CDATA[plot=True]]></description>
            <Point><coordinates>-122.32,47.46,0</coordinates></Point>
          </Placemark>
        </Folder>
      </Folder>
      <Folder>
        <name>KBFI</name>
        <Folder>
          <name>apron</name>
          <Placemark>
            <name>ramp</name>
            <Polygon>
              <outerBoundaryIs>
                <LinearRing>
                  <coordinates>-122.3,47.5,0 -122.31,47.5,0 -122.31,47.51,0 -122.3,47.5,0</coordinates>
                </LinearRing>
              </outerBoundaryIs>
            </Polygon>
          </Placemark>
        </Folder>
      </Folder>
    </Folder>
    <Folder>
      <name>Old Diagram REF</name>
      <Folder>
        <name>KSEA</name>
        <Folder>
          <name>runway</name>
          <Placemark>
            <name>circle</name>
            <LineString><coordinates>-122.3,47.44 -122.3,47.441</coordinates></LineString>
          </Placemark>
        </Folder>
      </Folder>
    </Folder>
  </Folder>
</Document>
</kml>
"#;

    #[test]
    fn test_parse_coordinates() {
        let points = parse_coordinates(" -122.3,47.44,0\n\t-122.31,47.45 junk  ").unwrap();
        assert_eq_sorted!(points.len(), 2);
        assert_eq_sorted!(points[1].x_y(), (-122.31, 47.45));

        assert!(matches!(
            parse_coordinates("-122.3,north"),
            Err(DiagramError::InvalidCoordinate(tuple)) if tuple == "-122.3,north"
        ));
    }

    #[test]
    fn test_parse_kml() {
        let diagrams = parse_kml(KML.as_bytes()).unwrap();

        assert_eq_sorted!(
            diagrams.keys().collect::<Vec<_>>(),
            vec!["KSEA", "KBFI"]
        );
        let ksea = &diagrams["KSEA"];
        assert_eq_sorted!(
            ksea.keys().collect::<Vec<_>>(),
            vec!["Current Diagrams", "Old Diagram REF"]
        );

        let current = &ksea["Current Diagrams"];
        let taxiways = &current.lines["taxiway"];
        assert_eq_sorted!(taxiways.len(), 2);
        assert_eq_sorted!(taxiways[0].name, "Taxiway A");
        assert_eq_sorted!(taxiways[0].draw, Draw::Plain);
        assert_eq_sorted!(taxiways[0].coordinates.len(), 3);
        assert_eq_sorted!(taxiways[0].coordinates[2].x_y(), (-122.302, 47.442));
        assert_eq_sorted!(taxiways[1].draw, Draw::Dashed(Some(30.0)));
        assert!(!taxiways[1].plot);

        let labels = &current.labels["twyrwy_labels"];
        assert_eq_sorted!(labels.len(), 2);
        assert_eq_sorted!(labels[0].name, "A & B");
        assert_eq_sorted!(labels[0].coordinate.x_y(), (-122.31, 47.45));
        assert!(!labels[0].plot);
        assert!(labels[1].plot);

        assert_eq_sorted!(ksea["Old Diagram REF"].lines["runway"][0].draw, Draw::Circle);

        let ramp = &diagrams["KBFI"]["Current Diagrams"].lines["apron"][0];
        assert_eq_sorted!(ramp.coordinates.len(), 4);
        assert_eq_sorted!(ramp.coordinates.first(), ramp.coordinates.last());
    }

    #[test]
    fn test_truncated_kml() {
        let truncated = &KML[..KML.find("<name>KBFI").unwrap()];
        assert!(matches!(
            parse_kml(truncated.as_bytes()),
            Err(DiagramError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_read_kmz() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(
            "doc.kml",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(KML.as_bytes()).unwrap();
        let archive = zip.finish().unwrap();

        let diagrams = read_kmz_from(Cursor::new(archive.into_inner())).unwrap();
        assert_eq_sorted!(diagrams.len(), 2);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(
            "other.kml",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(KML.as_bytes()).unwrap();
        let archive = zip.finish().unwrap();
        assert!(matches!(
            read_kmz_from(Cursor::new(archive.into_inner())),
            Err(DiagramError::Archive(_))
        ));
    }
}
