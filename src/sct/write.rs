use std::fmt::{self, Display};

use super::{SectionName, SectorFile};

/// Text form of a [`SectorFile`]: sections in fixed order, each followed by a blank line.
pub struct SectorFileWriter<'a> {
    sct: &'a SectorFile,
    version: &'a str,
}

impl<'a> SectorFileWriter<'a> {
    pub fn new(sct: &'a SectorFile, version: &'a str) -> Self {
        Self { sct, version }
    }
}

impl Display for SectorFileWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in SectionName::ALL {
            match (name, self.sct.section(name)) {
                (SectionName::Colors, _) => {
                    for definition in self.sct.colours.definitions() {
                        writeln!(f, "{definition}")?;
                    }
                }
                (SectionName::Info, Some(info)) => {
                    for (i, line) in info.lines.iter().enumerate() {
                        if i == 1 {
                            writeln!(f, "{line}{}", self.version)?;
                        } else {
                            writeln!(f, "{line}")?;
                        }
                    }
                }
                (SectionName::Sid, Some(sid)) => {
                    for line in sid
                        .subsections
                        .iter()
                        .flat_map(|subsection| &subsection.lines)
                    {
                        writeln!(f, "{line}")?;
                    }
                }
                (_, Some(section)) => {
                    for line in &section.lines {
                        writeln!(f, "{line}")?;
                    }
                }
                (_, None) => (),
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
