//! Build a per-cycle base-calling confusion matrix from aligned reads.
//!
//! Records are streamed from a BAM file, filtered, and walked against the reference. The
//! normalized matrix is printed once at the end; TSV metrics and a periodically refreshed
//! interim report are optional.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use bcqc_lib::bam_io::AlignmentSource;
use bcqc_lib::logging::{OperationTimer, format_count, log_filter_summary};
use bcqc_lib::matrix::ConfusionMatrix;
use bcqc_lib::metrics::writer::write_metrics_auto;
use bcqc_lib::pipeline::{
    ConfusionPipeline, DEFAULT_MAX_CYCLES, FilterCounts, InterimReport, PipelineConfig,
    ReferenceMode,
};
use bcqc_lib::reference::{FastaDirectory, FastaFile, ReferenceProvider, ReferenceWindow};
use bcqc_lib::validation::{validate_dir_exists, validate_positive};

use crate::commands::command::Command;
use crate::commands::common::{BamInputOptions, TextOutputOptions};

/// Reference file name meaning "no single reference file".
pub const NO_REFERENCE_FILE: &str = "NONE";

/// Build a base-calling confusion matrix.
#[derive(Debug, Parser)]
#[command(
    name = "confusion",
    about = "\x1b[38;5;72m[QC]\x1b[0m             \x1b[36mBuild a per-cycle base-calling confusion matrix\x1b[0m",
    long_about = r#"
Build a per-cycle base-calling confusion matrix from aligned reads.

For every aligned base the reference base and the called base are tallied by sequencing cycle.
Cycle 0 is the first base sequenced: the leftmost base of forward-strand reads and the
rightmost base of reverse-strand reads. Soft-clipped bases are compared to the reference they
would have covered; inserted bases advance the cycle without being counted.

Records are skipped when they are unmapped, hard clipped, soft clipped (with
--skip-soft-clipped), on an alternate contig (name containing '_'), or when their footprint
lies within --edge-margin bases of either chromosome end.

Reference modes:
  - Multi-chromosome (default): --ref-dir holds one FASTA per chromosome named
    <chrom>.fa, <chrom>.fasta, <chrom>.fa.gz or <chrom>.fasta.gz, loaded as the input
    reaches each chromosome. Edge margin defaults to 50.
  - Single reference (--ref-file): the first sequence of <ref-dir>/<ref-file> is used for
    every record. Edge margin defaults to 100.

The report has a block per reference base A, C, G and T. Each block has a line per called
base (A, C, G, T, N) holding the fraction of that reference base called as it at each
cycle. Cycles without coverage print NaN.

Example usage:
  bcqc confusion -i sample.bam -d refs/ -o sample.confusion.txt
  bcqc confusion -i amplicon.bam -d refs/ -f amplicon.fa -l 150 -m sample
"#
)]
pub struct Confusion {
    #[command(flatten)]
    pub io: BamInputOptions,

    /// Directory holding the reference FASTA file(s)
    #[arg(short = 'd', long = "ref-dir")]
    pub ref_dir: PathBuf,

    /// Single reference FASTA inside --ref-dir; NONE for per-chromosome files
    #[arg(short = 'f', long = "ref-file")]
    pub ref_file: Option<String>,

    /// Skip reads with any soft clipping
    #[arg(long = "skip-soft-clipped", default_value = "false")]
    pub skip_soft_clipped: bool,

    /// Number of cycles to track per read
    #[arg(short = 'l', long = "max-cycles", default_value_t = DEFAULT_MAX_CYCLES)]
    pub max_cycles: usize,

    #[command(flatten)]
    pub output: TextOutputOptions,

    /// Prefix for TSV metrics (<prefix>.cycle_errors.txt, .confusion.txt, .filters.txt)
    #[arg(short = 'm', long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Skip reads within this many bases of a chromosome end [default: 50, or 100 with --ref-file]
    #[arg(long = "edge-margin")]
    pub edge_margin: Option<usize>,

    /// Log progress every N records (0 to disable)
    #[arg(long = "progress-interval", default_value = "1000")]
    pub progress_interval: u64,

    /// Rewrite the report so far to this file every --interim-interval records
    #[arg(long = "interim-report")]
    pub interim_report: Option<PathBuf>,

    /// Records between interim reports
    #[arg(long = "interim-interval", default_value = "100000", requires = "interim_report")]
    pub interim_interval: u64,
}

impl Confusion {
    /// The single reference file, unless absent or the `NONE` sentinel.
    fn reference_file(&self) -> Option<&str> {
        self.ref_file.as_deref().filter(|f| *f != NO_REFERENCE_FILE)
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let mode = if self.reference_file().is_some() {
            ReferenceMode::Single
        } else {
            ReferenceMode::Multi
        };
        let config = PipelineConfig::new(mode)
            .with_max_cycles(self.max_cycles)
            .with_skip_soft_clipped(self.skip_soft_clipped);
        match self.edge_margin {
            Some(margin) => config.with_edge_margin(margin),
            None => config,
        }
    }

    fn run<P: ReferenceProvider>(
        &self,
        config: PipelineConfig,
        window: ReferenceWindow<P>,
        source: AlignmentSource,
    ) -> Result<()> {
        let names = source.reference_names();
        let mut pipeline = ConfusionPipeline::new(config, window, names)?
            .with_progress_interval(self.progress_interval);
        if let Some(path) = &self.interim_report {
            info!("Interim report: {} every {} records", path.display(), self.interim_interval);
            pipeline = pipeline.with_interim_report(InterimReport::new(path, self.interim_interval));
        }

        let timer = OperationTimer::new("Building confusion matrix");
        pipeline.run(source)?;
        let loads = pipeline.window().loads();
        let (matrix, counts) = pipeline.finish();
        timer.log_completion(counts.total_records);

        log_filter_summary(&counts);
        if loads > 0 {
            info!("Loaded {} reference sequences", format_count(loads as u64));
        }

        let mut out = self.output.open()?;
        matrix
            .report(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write report: {}", self.output.output.display()))?;

        if let Some(prefix) = &self.metrics {
            write_metrics_files(prefix, &matrix, &counts)?;
        }
        Ok(())
    }
}

/// `<prefix><suffix>` without treating the prefix as a directory.
fn prefixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

fn write_metrics_files(
    prefix: &Path,
    matrix: &ConfusionMatrix,
    counts: &FilterCounts,
) -> Result<()> {
    let cycle_errors = prefixed(prefix, ".cycle_errors.txt");
    write_metrics_auto(&cycle_errors, &matrix.error_profile())?;
    let confusion = prefixed(prefix, ".confusion.txt");
    write_metrics_auto(&confusion, &matrix.confusion_metrics())?;
    let filters = prefixed(prefix, ".filters.txt");
    write_metrics_auto(&filters, std::slice::from_ref(counts))?;
    info!("Wrote metrics to {}.*", prefix.display());
    Ok(())
}

impl Command for Confusion {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        self.io.validate()?;
        validate_dir_exists(&self.ref_dir, "ref-dir")?;
        validate_positive(self.max_cycles, "max-cycles")?;

        let config = self.pipeline_config();
        info!("Input: {}", self.io.input.display());
        info!("Reference directory: {}", self.ref_dir.display());
        info!("Max cycles: {}", config.max_cycles);
        info!("Edge margin: {}", config.edge_margin);
        if config.skip_soft_clipped {
            info!("Skipping soft-clipped reads");
        }

        let source = AlignmentSource::open(&self.io.input, self.io.threads)?;

        match self.reference_file() {
            Some(file) => {
                let fasta = FastaFile::new(self.ref_dir.join(file))?;
                let (name, sequence) = fasta.load_first()?;
                info!(
                    "Using reference {name} ({} bp) from {}",
                    format_count(sequence.len() as u64),
                    fasta.path().display()
                );
                self.run(config, ReferenceWindow::preloaded(fasta, name, sequence), source)
            }
            None => {
                let directory = FastaDirectory::new(&self.ref_dir)?;
                self.run(config, ReferenceWindow::new(directory), source)
            }
        }
    }
}
