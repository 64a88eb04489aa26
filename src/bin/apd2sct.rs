use std::{env, io, path::PathBuf, process::ExitCode};

use apd_sct::{
    config::Config,
    diagram::kml::read_kmz,
    synth::{
        font::FontOutlines,
        text::{GlyphOutlines, NoOutlines},
    },
    update::update_sector_file,
};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let Some(config_path) = env::args_os().nth(1).map(PathBuf::from) else {
        error!("usage: apd2sct <config.json>");
        return ExitCode::FAILURE;
    };
    let config = match Config::from_path(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };
    let diagrams = match read_kmz(&config.diagrams_path()) {
        Ok(diagrams) => diagrams,
        Err(e) => {
            error!("{}: {e}", config.diagrams_path().display());
            return ExitCode::FAILURE;
        }
    };
    let glyphs: Box<dyn GlyphOutlines> = match &config.font {
        Some(path) => match FontOutlines::from_path(&config.master_dir.join(path)) {
            Ok(font) => Box::new(font),
            Err(e) => {
                error!("{}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("No font configured, plotted text will be missing");
            Box::new(NoOutlines)
        }
    };

    let failed = config
        .sector_files
        .iter()
        .filter(|base| {
            update_sector_file(&config, base, &diagrams, glyphs.as_ref())
                .inspect_err(|e| error!("{e}"))
                .is_err()
        })
        .count();
    info!(
        "{} of {} sector files updated",
        config.sector_files.len() - failed,
        config.sector_files.len()
    );

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
