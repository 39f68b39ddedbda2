//! Print the contents of a cluster intensity file.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use bcqc_lib::cif::Cif;
use bcqc_lib::logging::format_count;
use bcqc_lib::validation::validate_file_exists;

use crate::commands::command::Command;
use crate::commands::common::TextOutputOptions;

/// Print a CIF header and its intensities.
#[derive(Debug, Parser)]
#[command(
    name = "cif",
    about = "\x1b[38;5;72m[QC]\x1b[0m             \x1b[36mPrint the header and intensities of a CIF file\x1b[0m",
    long_about = r#"
Print the header and intensities of an Illumina cluster intensity (CIF) file.

The header is printed first. Unless --header-only is given, each cluster then follows as its
index on a line of its own and one line per channel (0-3) holding the channel's intensity at
every cycle in the file.

Example usage:
  bcqc cif -i s_1_1101.cif
  bcqc cif -i s_1_1101.cif --header-only
"#
)]
pub struct CifDump {
    /// Input CIF file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: TextOutputOptions,

    /// Only print the header
    #[arg(long = "header-only", default_value = "false")]
    pub header_only: bool,
}

impl Command for CifDump {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        validate_file_exists(&self.input, "Input CIF")?;
        let source = self.input.display().to_string();
        let mut out = self.output.open()?;

        if self.header_only {
            let file = File::open(&self.input)
                .with_context(|| format!("Failed to open CIF file: {source}"))?;
            let header = Cif::read_header(&mut BufReader::new(file), &source)?;
            writeln!(out, "{header}")?;
        } else {
            let cif = Cif::from_path(&self.input)?;
            info!(
                "Read {} clusters over {} cycles",
                format_count(u64::from(cif.header().num_clusters)),
                cif.header().num_cycles
            );
            writeln!(out, "{cif}")?;
            cif.write_intensities(&mut out)?;
        }

        out.flush()
            .with_context(|| format!("Failed to write output: {}", self.output.output.display()))
    }
}
