use std::io;

use geo::{point, Point};
use serde::Serialize;
use tracing::warn;

pub mod colours;
pub mod config;
pub mod diagram;
pub mod geodesy;
pub mod sct;
pub mod synth;
pub mod update;

/// Encoding the sector file was read in, so it can be written back the same way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Windows1252,
}

impl SourceEncoding {
    pub fn encode(self, contents: &str) -> Vec<u8> {
        match self {
            SourceEncoding::Utf8 => contents.as_bytes().to_vec(),
            SourceEncoding::Windows1252 => {
                let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(contents);
                if unmappable {
                    warn!("characters not representable in win-1252 were replaced");
                }
                bytes.into_owned()
            }
        }
    }
}

fn read_to_string(contents: &[u8]) -> Result<(String, SourceEncoding), io::Error> {
    String::from_utf8(contents.to_vec())
        .map(|string| (string, SourceEncoding::Utf8))
        .or_else(|_| {
            let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
            if errors {
                warn!("errors while decoding win-1252");
            }
            Ok((string.to_string(), SourceEncoding::Windows1252))
        })
}

/// One half of a sexagesimal coordinate, e.g. `S122.18.33.500`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegMinSec {
    /// +1 for N/E, -1 for S/W
    pub sign: f64,
    pub degrees: u16,
    pub minutes: u8,
    pub seconds: f64,
}

impl DegMinSec {
    pub fn to_decimal(self) -> f64 {
        self.sign
            * (f64::from(self.degrees) + f64::from(self.minutes) / 60.0 + self.seconds / 3600.0)
    }
}

// zero is written with the positive hemisphere, matching the N000.00.00.000 E000.00.00.000
// placeholders of the format
fn decimal_to_dms(decimal: f64, positive: char, negative: char) -> String {
    let hemisphere = if decimal >= 0.0 { positive } else { negative };
    let decimal = decimal.abs();
    let mut degrees = decimal.trunc() as u16;
    let minutes = (decimal - decimal.trunc()) * 60.0;
    let mut seconds = ((minutes - minutes.trunc()) * 60_000.0).round() / 1000.0;
    let mut minutes = minutes.trunc() as u8;

    // rounding to milliseconds can reach the next minute
    if seconds >= 60.0 {
        seconds = 0.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes = 0;
        degrees += 1;
    }

    format!("{hemisphere}{degrees:03}.{minutes:02}.{seconds:06.3}")
}

pub trait DegMinSecExt {
    fn from_deg_min_sec(lat: DegMinSec, lng: DegMinSec) -> Self;
    fn lat_deg_min_sec_fmt(&self) -> String;
    fn lng_deg_min_sec_fmt(&self) -> String;
    fn deg_min_sec_fmt(&self) -> String {
        format!(
            "{} {}",
            self.lat_deg_min_sec_fmt(),
            self.lng_deg_min_sec_fmt()
        )
    }
}

impl DegMinSecExt for Point {
    fn from_deg_min_sec(lat: DegMinSec, lng: DegMinSec) -> Self {
        point! { x: lng.to_decimal(), y: lat.to_decimal() }
    }

    fn lat_deg_min_sec_fmt(&self) -> String {
        decimal_to_dms(self.y(), 'N', 'S')
    }

    fn lng_deg_min_sec_fmt(&self) -> String {
        decimal_to_dms(self.x(), 'E', 'W')
    }
}
