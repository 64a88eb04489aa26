//! Airport diagrams to merge into sector files: per airport, per category, per colour, the lines
//! and labels to draw.

pub mod kml;

use std::io;

use bevy_derive::{Deref, DerefMut};
use geo::Point;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Description marking a line or label as text to be drawn with the vector font.
pub const PLOT_DESCRIPTION: &str = "plot=True";
pub const DEFAULT_DASH_FEET: f64 = 60.0;

#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("failed to read diagram archive: {0}")]
    FileRead(#[from] io::Error),
    #[error("invalid diagram archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("invalid KML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid KML coordinate {0:?}")]
    InvalidCoordinate(String),
    #[error("unexpected end of KML inside <{0}>")]
    UnexpectedEnd(String),
}

/// How a diagram line is drawn, from the placemark name.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Draw {
    Plain,
    /// dash length in feet, default when `None`
    Dashed(Option<f64>),
    Circle,
}

impl Draw {
    pub fn from_name(name: &str) -> Self {
        match name {
            "circle" => Self::Circle,
            "dashed" => Self::Dashed(None),
            _ => match name.strip_prefix("dashed_") {
                Some(spacing) => match spacing.parse::<f64>() {
                    Ok(feet) if feet > 0.0 => Self::Dashed(Some(feet)),
                    _ => {
                        warn!("Invalid dash spacing {spacing:?}, using {DEFAULT_DASH_FEET} ft");
                        Self::Dashed(None)
                    }
                },
                None => Self::Plain,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub draw: Draw,
    pub coordinates: Vec<Point>,
    /// draw `name` as text along the first two coordinates instead of the path
    pub plot: bool,
}

impl LineItem {
    pub fn new(name: &str, coordinates: Vec<Point>, description: &str) -> Self {
        Self {
            name: name.to_string(),
            draw: Draw::from_name(name),
            coordinates,
            plot: description == PLOT_DESCRIPTION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelItem {
    pub name: String,
    pub coordinate: Point,
    /// draw `name` as text at `coordinate` instead of a label record
    pub plot: bool,
}

impl LabelItem {
    pub fn new(name: &str, coordinate: Point, description: &str) -> Self {
        Self {
            name: name.to_string(),
            coordinate,
            plot: description == PLOT_DESCRIPTION,
        }
    }
}

/// Lines and labels of one category, grouped by colour.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Category {
    pub lines: IndexMap<String, Vec<LineItem>>,
    pub labels: IndexMap<String, Vec<LabelItem>>,
}

/// Category name -> content, for one airport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct AirportDiagram(IndexMap<String, Category>);

/// ICAO -> diagram, in the order the airports were read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct Diagrams(IndexMap<String, AirportDiagram>);

impl Diagrams {
    fn category_mut(&mut self, airport: &str, category: &str) -> &mut Category {
        self.entry(airport.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default()
    }

    pub fn add_line(&mut self, airport: &str, category: &str, colour: &str, line: LineItem) {
        self.category_mut(airport, category)
            .lines
            .entry(colour.to_string())
            .or_default()
            .push(line);
    }

    pub fn add_label(&mut self, airport: &str, category: &str, colour: &str, label: LabelItem) {
        self.category_mut(airport, category)
            .labels
            .entry(colour.to_string())
            .or_default()
            .push(label);
    }

    /// Diagrams of the `served` airports, in diagram order.
    pub fn relevant<'a>(
        &'a self,
        served: &'a [String],
    ) -> impl Iterator<Item = (&'a str, &'a AirportDiagram)> + 'a {
        self.iter()
            .filter(|(icao, _)| served.contains(*icao))
            .map(|(icao, diagram)| (icao.as_str(), diagram))
    }
}

#[cfg(test)]
mod test {
    use geo::point;
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{Diagrams, Draw, LabelItem, LineItem};

    #[test]
    fn test_draw_from_name() {
        assert_eq_sorted!(Draw::from_name("circle"), Draw::Circle);
        assert_eq_sorted!(Draw::from_name("dashed"), Draw::Dashed(None));
        assert_eq_sorted!(Draw::from_name("dashed_100"), Draw::Dashed(Some(100.0)));
        assert_eq_sorted!(Draw::from_name("dashed_wide"), Draw::Dashed(None));
        assert_eq_sorted!(Draw::from_name("dashed_-5"), Draw::Dashed(None));
        assert_eq_sorted!(Draw::from_name("Taxiway A"), Draw::Plain);
        assert_eq_sorted!(Draw::from_name("Circle"), Draw::Plain);
    }

    #[test]
    fn test_plot_flag() {
        let coordinate = point! { x: -122.3, y: 47.4 };
        assert!(LineItem::new("A", vec![coordinate], "plot=True").plot);
        assert!(!LineItem::new("A", vec![coordinate], "plot=true").plot);
        assert!(LabelItem::new("A", coordinate, "plot=True").plot);
        assert!(!LabelItem::new("A", coordinate, "").plot);
    }

    #[test]
    fn test_relevant() {
        let coordinate = point! { x: -122.3, y: 47.4 };
        let mut diagrams = Diagrams::default();
        diagrams.add_label("KSEA", "Current", "red", LabelItem::new("A", coordinate, ""));
        diagrams.add_label("KBFI", "Current", "red", LabelItem::new("B", coordinate, ""));
        diagrams.add_label("KPAE", "Current", "red", LabelItem::new("C", coordinate, ""));
        diagrams.add_label("KSEA", "Current", "red", LabelItem::new("D", coordinate, ""));

        let served = vec!["KPAE".to_string(), "KSEA".to_string()];
        assert_eq_sorted!(
            diagrams
                .relevant(&served)
                .map(|(icao, _)| icao)
                .collect::<Vec<_>>(),
            vec!["KSEA", "KPAE"]
        );
        assert_eq_sorted!(diagrams["KSEA"]["Current"].labels["red"].len(), 2);
    }
}
