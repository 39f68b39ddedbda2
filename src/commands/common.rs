//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use bcqc_lib::bam_io::is_stdin_path;
use bcqc_lib::validation::validate_file_exists;

/// Input BAM options for commands that stream aligned records.
#[derive(Debug, Clone, Args)]
pub struct BamInputOptions {
    /// Input BAM file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Number of threads for BGZF decompression
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,
}

impl BamInputOptions {
    /// Validates that the input file exists (skipped for stdin paths).
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> Result<()> {
        if !is_stdin_path(&self.input) {
            validate_file_exists(&self.input, "Input BAM")?;
        }
        Ok(())
    }
}

/// Text output destination, defaulting to stdout.
#[derive(Debug, Clone, Args)]
pub struct TextOutputOptions {
    /// Output file (`-` for stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,
}

impl TextOutputOptions {
    /// Opens the output for buffered writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created.
    pub fn open(&self) -> Result<Box<dyn Write>> {
        open_text_output(&self.output)
    }
}

/// Check if a path refers to stdout (`-` or `/dev/stdout`).
#[must_use]
pub fn is_stdout_path<P: AsRef<Path>>(path: P) -> bool {
    let path_str = path.as_ref().to_string_lossy();
    path_str == "-" || path_str == "/dev/stdout"
}

/// Opens `path` (or stdout) as a buffered text writer.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn open_text_output(path: &Path) -> Result<Box<dyn Write>> {
    if is_stdout_path(path) {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("-", true)]
    #[case("/dev/stdout", true)]
    #[case("report.txt", false)]
    fn test_is_stdout_path(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_stdout_path(path), expected);
    }

    #[test]
    fn test_bam_input_validate() {
        let missing = BamInputOptions { input: PathBuf::from("/nonexistent.bam"), threads: 1 };
        assert!(missing.validate().is_err());

        let stdin = BamInputOptions { input: PathBuf::from("-"), threads: 1 };
        assert!(stdin.validate().is_ok());
    }

    #[test]
    fn test_open_text_output_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.txt");
        {
            let mut out = open_text_output(&path)?;
            writeln!(out, "hello")?;
            out.flush()?;
        }
        assert_eq!(std::fs::read_to_string(&path)?, "hello\n");
        Ok(())
    }

    #[test]
    fn test_open_text_output_bad_dir() {
        assert!(open_text_output(Path::new("/nonexistent/dir/out.txt")).is_err());
    }
}
