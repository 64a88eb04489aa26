//! Run configuration, read from JSON.

use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::colours::DEFAULT_BRIGHTNESS;
use crate::diagram::Diagrams;
use crate::sct::{labels::DEFAULT_PRUNE_RADIUS_NM, AirportTable};
use crate::synth::DEFAULT_TAXIWAY_LABEL_COLOUR;

const SECTOR_CODE_LENGTH: usize = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] serde_json::Error),
}

fn default_catch_all_sectors() -> Vec<String> {
    vec!["ZSE".to_string()]
}

fn default_brightness() -> f64 {
    DEFAULT_BRIGHTNESS
}

fn default_prune_radius_nm() -> f64 {
    DEFAULT_PRUNE_RADIUS_NM
}

fn default_taxiway_label_colour() -> String {
    DEFAULT_TAXIWAY_LABEL_COLOUR.to_string()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// directory of the input and output sector files
    #[serde(default)]
    pub master_dir: PathBuf,
    /// KMZ archive, relative to `master_dir`
    pub diagrams: PathBuf,
    pub airac: String,
    /// appended to output file names and the sector name
    #[serde(default)]
    pub version: String,
    /// sector file names without cycle and extension
    pub sector_files: Vec<String>,
    /// ICAO -> sector code whose files get the airport's diagram
    #[serde(default)]
    pub airport_sectors: IndexMap<String, String>,
    /// sector codes whose files get every configured airport
    #[serde(default = "default_catch_all_sectors")]
    pub catch_all_sectors: Vec<String>,
    /// font for text drawn as lines
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "default_brightness")]
    pub brightness: f64,
    #[serde(default = "default_prune_radius_nm")]
    pub prune_radius_nm: f64,
    #[serde(default = "default_taxiway_label_colour")]
    pub taxiway_label_colour: String,
}

pub type ConfigResult = Result<Config, ConfigError>;

impl Config {
    pub fn parse(content: &[u8]) -> ConfigResult {
        Ok(serde_json::from_slice(content)?)
    }

    pub fn from_path(path: &Path) -> ConfigResult {
        Self::parse(&fs_err::read(path)?)
    }

    pub fn diagrams_path(&self) -> PathBuf {
        self.master_dir.join(&self.diagrams)
    }

    /// `<base>_<airac>.sct2`
    pub fn input_path(&self, base: &str) -> PathBuf {
        self.master_dir.join(format!("{base}_{}.sct2", self.airac))
    }

    /// `<base>_<airac><version>.sct2`
    pub fn output_path(&self, base: &str) -> PathBuf {
        self.master_dir
            .join(format!("{base}_{}{}.sct2", self.airac, self.version))
    }

    /// Airports whose diagrams belong in the files of `sector`. Without configured airports,
    /// every diagram airport the file knows is served.
    pub fn served_airports(
        &self,
        sector: &str,
        airports: &AirportTable,
        diagrams: &Diagrams,
    ) -> Vec<String> {
        let served = if self.catch_all_sectors.iter().any(|code| code == sector) {
            self.airport_sectors.keys().cloned().collect::<Vec<_>>()
        } else {
            self.airport_sectors
                .iter()
                .filter(|(_, code)| *code == sector)
                .map(|(icao, _)| icao.clone())
                .collect()
        };
        if !served.is_empty() {
            return served;
        }

        debug!("no airports configured for {sector}, using the file's airports");
        diagrams
            .keys()
            .filter(|icao| airports.contains_key(*icao))
            .cloned()
            .collect()
    }
}

/// First three characters of a sector file name.
pub fn sector_code(base: &str) -> &str {
    base.char_indices()
        .nth(SECTOR_CODE_LENGTH)
        .map_or(base, |(end, _)| &base[..end])
}
