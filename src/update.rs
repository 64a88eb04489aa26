//! One sector file, start to end: parse, merge diagrams, prune labels, write.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, info_span};

use crate::colours::Colours;
use crate::config::{sector_code, Config};
use crate::diagram::Diagrams;
use crate::sct::{SctError, SectorFile};
use crate::synth::text::GlyphOutlines;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: SctError },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: SctError },
}

/// Reads `<base>_<airac>.sct2`, adds the diagrams of its served airports and writes
/// `<base>_<airac><version>.sct2`. Returns the written path.
pub fn update_sector_file(
    config: &Config,
    base: &str,
    diagrams: &Diagrams,
    glyphs: &dyn GlyphOutlines,
) -> Result<PathBuf, UpdateError> {
    let _span = info_span!("sector_file", file = base).entered();
    let input = config.input_path(base);
    info!("Processing {}", input.display());

    let mut sct = SectorFile::from_path(&input, Colours::new(config.brightness))
        .map_err(|source| UpdateError::Read {
            path: input.clone(),
            source,
        })?;

    let served = config.served_airports(sector_code(base), &sct.airports, diagrams);
    let outcome = sct.merge_diagrams(
        diagrams.relevant(&served),
        glyphs,
        &config.taxiway_label_colour,
    );
    let pruned = sct.prune_labels(&outcome.labelled_airports, config.prune_radius_nm);
    info!(
        "{} airports labelled, {pruned} old labels pruned",
        outcome.labelled_airports.len()
    );
    sct.append_labels(outcome.labels);

    let output = config.output_path(base);
    sct.write(&output, &config.version)
        .map_err(|source| UpdateError::Write {
            path: output.clone(),
            source,
        })?;
    info!("Wrote {}", output.display());

    Ok(output)
}
