use std::collections::HashMap;

use bevy_derive::{Deref, DerefMut};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Default brightness multiplier applied to palette colours.
pub const DEFAULT_BRIGHTNESS: f64 = 1.0;

type Palette = phf::Map<&'static str, &'static str>;
/// Colour names known to every sector file, keys lowercased.
pub static DEFAULT_PALETTE: Palette = phf_map! {
    "apron" => "#808080",
    "aqua" => "#00ffff",
    "background" => "#000000",
    "black" => "#000000",
    "blue" => "#0000ff",
    "building" => "#ff0000",
    "buildingterminallabels" => "#408080",
    "centerline" => "#606060",
    "classb" => "#004080",
    "classc" => "#800080",
    "classd" => "#003060",
    "classesfc" => "#400040",
    "closed" => "#ff0000",
    "color_airspacea" => "#008080",
    "color_airspaceb" => "#008080",
    "color_airspacec" => "#008080",
    "color_airspaced" => "#008080",
    "color_airspacee" => "#008080",
    "color_airspacef" => "#800080",
    "color_airspaceg" => "#008080",
    "color_aorapproach1" => "#0000ff",
    "color_aorapproach2" => "#ff8000",
    "color_aorapproach3" => "#910546",
    "color_aorapproach4" => "#7e7e7e",
    "color_aorapproach5" => "#7e7e7e",
    "color_aorcenter1" => "#646464",
    "color_aorcenter2" => "#422100",
    "color_aorcenter3" => "#7e7e7e",
    "color_aorcenter4" => "#7e7e7e",
    "color_aorcenter5" => "#7e7e7e",
    "color_aordeparture1" => "#808000",
    "color_aordeparture2" => "#7e7e7e",
    "color_aorground1" => "#800000",
    "color_aorground2" => "#008000",
    "color_app" => "#0000ff",
    "color_building" => "#808080",
    "color_centerlines" => "#a6d90c",
    "color_closurearea" => "#ff0000",
    "color_coastline" => "#0000ff",
    "color_dangerarea" => "#800000",
    "color_firborder" => "#808080",
    "color_grassurface" => "#003200",
    "color_groundlayergras" => "#202a30",
    "color_hardsurface1" => "#5a5648",
    "color_hardsurface2" => "#636363",
    "color_holding" => "#800000",
    "color_landmark1" => "#7e7e7e",
    "color_landmark2" => "#7e7e7e",
    "color_landmark3" => "#7e7e7e",
    "color_landmark4" => "#7e7e7e",
    "color_landmark5" => "#7e7e7e",
    "color_mrva1" => "#68540d",
    "color_mrva2" => "#443708",
    "color_parkpos" => "#008000",
    "color_parkposunused" => "#800000",
    "color_releaseline" => "#008000",
    "color_restrictedarea" => "#800000",
    "color_rmz" => "#800080",
    "color_runwayconcrete" => "#808080",
    "color_runwaygrass" => "#008000",
    "color_sid" => "#00ff00",
    "color_star" => "#ff0000",
    "color_stopbar" => "#ff0000",
    "color_tacan-route" => "#004080",
    "color_taxiway" => "#c0b631",
    "color_taxiwayblue" => "#004080",
    "color_taxiwayborder" => "#0000ff",
    "color_taxiwaygreen" => "#008000",
    "color_taxiwayorange" => "#ffa500",
    "color_tma" => "#000000",
    "color_tmz" => "#800000",
    "color_twr-ctr" => "#000000",
    "color_uppersector" => "#422100",
    "color_vectors" => "#000000",
    "color_vfr-route" => "#000000",
    "color_water" => "#004080",
    "fuchsia" => "#ff00ff",
    "gray" => "#808080",
    "green" => "#008000",
    "holdshort" => "#ffff00",
    "ilsholdshort" => "#ffff9f",
    "interstate" => "#400040",
    "lawngreen" => "#7cfc00",
    "lime" => "#00ff00",
    "maroon" => "#800000",
    "mea" => "#3f3f3f",
    "mia_color" => "#3f3f3f",
    "mountain" => "#ff8000",
    "mva" => "#3f3f3f",
    "navy" => "#000080",
    "nonmovementareaboundary" => "#53afc4",
    "olive" => "#808000",
    "orange" => "#ff8000",
    "purple" => "#800080",
    "ramp" => "#808080",
    "ramplabels" => "#808040",
    "red" => "#ff0000",
    "river" => "#000030",
    "runway" => "#00ffff",
    "runwayedge" => "#00ffff",
    "runwaymarks" => "#ffff00",
    "sector" => "#408040",
    "sector2" => "#008000",
    "sector3" => "#008080",
    "sectorlabel" => "#800080",
    "silver" => "#c0c0c0",
    "split" => "#313131",
    "state" => "#a08080",
    "taxi" => "#0000ff",
    "taxiway" => "#0000ff",
    "taxiwayedge" => "#0000ff",
    "taxiwaylabel" => "#ffffff",
    "teal" => "#008080",
    "tracon" => "#006633",
    "water" => "#000030",
    "white" => "#ffffff",
    "yellow" => "#ffff00",
    "zse_mia" => "#800080",
    "taxiold" => "#ff00ff",
    "displacedthreshold" => "#ffffff",
    "helipad" => "#ffaa00",
    "taxilane_labels" => "#85c562",
    "twyrwy_labels" => "#ffffff",
    "blastpad" => "#ffff7f",
    "movementarea" => "#aaffff",
    "oldtaxiway" => "#ff55ff",
    "taxilane" => "#00aaff",
    "ramp_labels" => "#808040",
    "building_labels" => "#408080",
    "blast" => "#ffff7f",
    "runwaylabel" => "#ffffff",
    "txyrwy_labels" => "#ffffff",
};

static HASH_RGB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap());
static PACKED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,8}$").unwrap());

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColourError {
    #[error("not a colour in the format #rrggbb: {0}")]
    InvalidHex(String),
}

/// Whether `token` is an already packed colour value rather than a name.
pub fn is_packed_literal(token: &str) -> bool {
    PACKED_RE.is_match(token)
}

/// Packs `#rrggbb` as `r + g * 256 + b * 65536`, each channel scaled by `brightness` first.
pub fn packed_from_hex(hex: &str, brightness: f64) -> Result<u32, ColourError> {
    let captures = HASH_RGB_RE
        .captures(hex)
        .ok_or_else(|| ColourError::InvalidHex(hex.to_string()))?;
    let channel = |i: usize| {
        let value = u8::from_str_radix(&captures[i], 16)
            .map_err(|_| ColourError::InvalidHex(hex.to_string()))?;
        Ok::<_, ColourError>((f64::from(value) * brightness).trunc().clamp(0.0, 255.0) as u32)
    };

    Ok(channel(1)? + channel(2)? * 256 + channel(3)? * 65536)
}

pub fn hex_from_packed(packed: u32) -> String {
    let blue = packed / 65536;
    let green = (packed - blue * 65536) / 256;
    let red = packed - blue * 65536 - green * 256;
    format!("#{red:02x}{green:02x}{blue:02x}")
}

/// Colour keys referenced by the file, in the order they were first seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deref, DerefMut)]
pub struct UsedColours(IndexSet<String>);

/// Palette lookups plus the set of colours a sector file actually uses.
#[derive(Clone, Debug, Serialize)]
pub struct Colours {
    brightness: f64,
    /// `#define`s found in the sector file itself
    file_defined: HashMap<String, u32>,
    used: UsedColours,
}

impl Default for Colours {
    fn default() -> Self {
        Self::new(DEFAULT_BRIGHTNESS)
    }
}

impl Colours {
    pub fn new(brightness: f64) -> Self {
        Self {
            brightness,
            file_defined: HashMap::new(),
            used: UsedColours::default(),
        }
    }

    /// Remembers a `#define <name> <value>` of the input file.
    pub fn define(&mut self, name: &str, value: &str) {
        match value.parse() {
            Ok(packed) => {
                self.file_defined.insert(name.to_lowercase(), packed);
            }
            Err(e) => warn!("Could not parse colour definition {name}={value}: {e}"),
        }
    }

    /// Packed value for a colour name (case-insensitive) or numeric literal.
    pub fn resolve(&self, token: &str) -> Option<u32> {
        let key = token.to_lowercase();
        if let Some(hex) = DEFAULT_PALETTE.get(key.as_str()) {
            return match packed_from_hex(hex, self.brightness) {
                Ok(packed) => Some(packed),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            };
        }
        if is_packed_literal(token) {
            return token.parse().ok();
        }
        self.file_defined.get(&key).copied()
    }

    /// Adds the colour to the used set. Unresolvable colours are reported and not added.
    pub fn mark_used(&mut self, token: &str) -> bool {
        if self.resolve(token).is_none() {
            warn!("Colour not found: {token}");
            return false;
        }
        let key = token.to_lowercase();
        if !self.used.contains(&key) {
            self.used.insert(key);
        }
        true
    }

    pub fn used(&self) -> &UsedColours {
        &self.used
    }

    /// `#define` lines for every used colour, numeric literals passed through as written.
    pub fn definitions(&self) -> Vec<String> {
        self.used
            .iter()
            .filter_map(|key| {
                if is_packed_literal(key) {
                    Some(format!("#define {key} {key}"))
                } else {
                    self.resolve(key)
                        .map(|packed| format!("#define {key} {packed}"))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{hex_from_packed, packed_from_hex, Colours, DEFAULT_PALETTE};

    #[test]
    fn test_packed_byte_order() {
        assert_eq_sorted!(packed_from_hex("#ff0000", 1.0), Ok(255));
        assert_eq_sorted!(packed_from_hex("#00ff00", 1.0), Ok(65280));
        assert_eq_sorted!(packed_from_hex("#0000ff", 1.0), Ok(16_711_680));
        assert_eq_sorted!(packed_from_hex("808080", 1.0), Ok(8_421_504));
        assert!(packed_from_hex("#80808", 1.0).is_err());
    }

    #[test]
    fn test_brightness_clamped() {
        assert_eq_sorted!(packed_from_hex("#c08000", 2.0), Ok(255 + 255 * 256));
        assert_eq_sorted!(packed_from_hex("#808080", 0.5), Ok(64 + 64 * 256 + 64 * 65536));
    }

    #[test]
    fn test_hex_roundtrip() {
        for hex in DEFAULT_PALETTE.values() {
            assert_eq_sorted!(&hex_from_packed(packed_from_hex(hex, 1.0).unwrap()), hex);
        }
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(51) {
                    let hex = format!("#{r:02x}{g:02x}{b:02x}");
                    assert_eq_sorted!(hex_from_packed(packed_from_hex(&hex, 1.0).unwrap()), hex);
                }
            }
        }
    }

    #[test]
    fn test_resolve() {
        let mut colours = Colours::default();
        assert_eq_sorted!(colours.resolve("TaxiwayLabel"), Some(16_777_215));
        assert_eq_sorted!(colours.resolve("taxiwaylabel"), Some(16_777_215));
        assert_eq_sorted!(colours.resolve("12345"), Some(12345));
        assert_eq_sorted!(colours.resolve("123456789"), None);
        assert_eq_sorted!(colours.resolve("COLOR_Unknown"), None);

        colours.define("COLOR_Unknown", "4210752");
        assert_eq_sorted!(colours.resolve("color_unknown"), Some(4_210_752));
    }

    #[test]
    fn test_used_colours_first_used_order() {
        let mut colours = Colours::default();
        assert!(colours.mark_used("red"));
        assert!(colours.mark_used("8421504"));
        assert!(colours.mark_used("Taxiway"));
        assert!(colours.mark_used("RED"));
        assert!(!colours.mark_used("nonsense"));

        assert_eq_sorted!(
            colours.definitions(),
            vec![
                "#define red 255".to_string(),
                "#define 8421504 8421504".to_string(),
                "#define taxiway 16711680".to_string(),
            ]
        );
    }
}
