//! The confusion-matrix pipeline.
//!
//! [`ConfusionPipeline`] pulls aligned records in order, filters them and walks the survivors
//! into a [`ConfusionMatrix`]. Filters run in this order, and the first that applies decides
//! the [`SkipReason`]:
//!
//! 1. unmapped
//! 2. hard clipped
//! 3. soft clipped, when soft-clipped reads are excluded
//! 4. no query bases
//! 5. alternate contig (multi-chromosome mode only; the window is loaded here otherwise)
//! 6. footprint within the edge margin of the chromosome start or end
//!
//! The window has to be resolved before the edge check because the check needs the length of
//! the chromosome the record is on. An alternate-contig record is therefore counted as
//! [`SkipReason::AlternateContig`] even when it also lies near a chromosome end.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::clip::{Footprint, is_hard_clipped, is_soft_clipped};
use crate::errors::BcqcError;
use crate::matrix::ConfusionMatrix;
use crate::metrics::{Metric, ProcessingMetrics};
use crate::progress::ProgressTracker;
use crate::record::{AlignedRecord, Strand};
use crate::reference::{ReferenceProvider, ReferenceWindow, WindowStatus};
use crate::walker::CigarWalker;

/// Number of cycles tracked unless configured otherwise.
pub const DEFAULT_MAX_CYCLES: usize = 250;

/// How reference sequences are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMode {
    /// One sequence, loaded up front and used for every record.
    Single,
    /// One file per chromosome, loaded as the alignment stream reaches it.
    Multi,
}

impl ReferenceMode {
    /// Default distance from either chromosome end inside which records are skipped.
    #[must_use]
    pub const fn default_edge_margin(self) -> usize {
        match self {
            ReferenceMode::Single => 100,
            ReferenceMode::Multi => 50,
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub mode: ReferenceMode,
    /// Cycles tracked per read; later cycles are ignored
    pub max_cycles: usize,
    /// Skip any record with a soft clip
    pub skip_soft_clipped: bool,
    /// Records whose footprint comes within this many bases of a chromosome end are skipped
    pub edge_margin: usize,
}

impl PipelineConfig {
    /// Configuration with the defaults for `mode`.
    #[must_use]
    pub fn new(mode: ReferenceMode) -> Self {
        Self {
            mode,
            max_cycles: DEFAULT_MAX_CYCLES,
            skip_soft_clipped: false,
            edge_margin: mode.default_edge_margin(),
        }
    }

    #[must_use]
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    #[must_use]
    pub fn with_skip_soft_clipped(mut self, skip: bool) -> Self {
        self.skip_soft_clipped = skip;
        self
    }

    #[must_use]
    pub fn with_edge_margin(mut self, edge_margin: usize) -> Self {
        self.edge_margin = edge_margin;
        self
    }

    /// # Errors
    /// Returns [`BcqcError::InvalidParameter`] if `max_cycles` is zero.
    pub fn validate(&self) -> crate::errors::Result<()> {
        if self.max_cycles == 0 {
            return Err(BcqcError::InvalidParameter {
                parameter: "max-cycles".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Why a record did not contribute to the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Unmapped,
    HardClipped,
    SoftClipped,
    NoBases,
    AlternateContig,
    NearReferenceStart,
    NearReferenceEnd,
}

impl SkipReason {
    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unmapped => "that were unmapped",
            Self::HardClipped => "that were hard clipped",
            Self::SoftClipped => "that were soft clipped",
            Self::NoBases => "without any bases",
            Self::AlternateContig => "on alternate contigs",
            Self::NearReferenceStart => "too close to the reference start",
            Self::NearReferenceEnd => "too close to the reference end",
        }
    }
}

/// Tallies of what happened to every record read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounts {
    /// Records read from the input
    pub total_records: u64,
    pub unmapped: u64,
    pub hard_clipped: u64,
    pub soft_clipped: u64,
    pub no_bases: u64,
    pub alternate_contig: u64,
    pub near_reference_start: u64,
    pub near_reference_end: u64,
    /// Forward-strand records walked
    pub forward: u64,
    /// Reverse-strand records walked
    pub reverse: u64,
    /// Bases added to the matrix
    pub observations: u64,
}

impl FilterCounts {
    pub fn record_skip(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::Unmapped => &mut self.unmapped,
            SkipReason::HardClipped => &mut self.hard_clipped,
            SkipReason::SoftClipped => &mut self.soft_clipped,
            SkipReason::NoBases => &mut self.no_bases,
            SkipReason::AlternateContig => &mut self.alternate_contig,
            SkipReason::NearReferenceStart => &mut self.near_reference_start,
            SkipReason::NearReferenceEnd => &mut self.near_reference_end,
        };
        *counter += 1;
    }

    /// Count for a single skip reason.
    #[must_use]
    pub fn skipped_for(&self, reason: SkipReason) -> u64 {
        match reason {
            SkipReason::Unmapped => self.unmapped,
            SkipReason::HardClipped => self.hard_clipped,
            SkipReason::SoftClipped => self.soft_clipped,
            SkipReason::NoBases => self.no_bases,
            SkipReason::AlternateContig => self.alternate_contig,
            SkipReason::NearReferenceStart => self.near_reference_start,
            SkipReason::NearReferenceEnd => self.near_reference_end,
        }
    }

    /// Records walked on either strand.
    #[must_use]
    pub fn walked(&self) -> u64 {
        self.forward + self.reverse
    }
}

impl Metric for FilterCounts {
    fn metric_name() -> &'static str {
        "read filter"
    }
}

impl ProcessingMetrics for FilterCounts {
    fn total_input(&self) -> u64 {
        self.total_records
    }

    fn total_output(&self) -> u64 {
        self.walked()
    }

    fn total_filtered(&self) -> u64 {
        self.total_records - self.walked()
    }
}

/// Periodic snapshot of the unfinished report, overwritten at every interval.
#[derive(Debug, Clone)]
pub struct InterimReport {
    path: PathBuf,
    interval: u64,
}

impl InterimReport {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, interval: u64) -> Self {
        Self { path: path.into(), interval }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_due(&self, records: u64) -> bool {
        self.interval > 0 && records > 0 && records.is_multiple_of(self.interval)
    }

    /// Writes `matrix` to the interim report path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write(&self, matrix: &ConfusionMatrix) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create interim report: {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        matrix.report(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Drives records through the filters and the walker into a confusion matrix.
pub struct ConfusionPipeline<P> {
    config: PipelineConfig,
    walker: CigarWalker,
    window: ReferenceWindow<P>,
    reference_names: Vec<String>,
    matrix: ConfusionMatrix,
    counts: FilterCounts,
    progress: ProgressTracker,
    interim: Option<InterimReport>,
}

impl<P: ReferenceProvider> ConfusionPipeline<P> {
    /// Creates a pipeline.
    ///
    /// `reference_names` maps reference ids to chromosome names and is only consulted in
    /// [`ReferenceMode::Multi`]. In [`ReferenceMode::Single`] the window must already hold the
    /// reference sequence.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: PipelineConfig,
        window: ReferenceWindow<P>,
        reference_names: Vec<String>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            walker: CigarWalker::new(config.max_cycles),
            matrix: ConfusionMatrix::new(config.max_cycles),
            config,
            window,
            reference_names,
            counts: FilterCounts::default(),
            progress: ProgressTracker::new("Processed records").with_interval(0),
            interim: None,
        })
    }

    /// Logs progress every `interval` records.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress = ProgressTracker::new("Processed records").with_interval(interval);
        self
    }

    /// Writes the report so far to `interim` at its interval.
    #[must_use]
    pub fn with_interim_report(mut self, interim: InterimReport) -> Self {
        self.interim = Some(interim);
        self
    }

    /// Resolves the reference sequence for `record`, or the reason to skip it.
    fn resolve_reference(&mut self, record: &AlignedRecord, ref_id: usize) -> Result<bool> {
        if self.config.mode == ReferenceMode::Single {
            return Ok(true);
        }
        let Some(name) = self.reference_names.get(ref_id) else {
            bail!(
                "Record {} refers to reference id {ref_id} but the header lists {} sequences",
                record.label(),
                self.reference_names.len()
            );
        };
        let status = self.window.ensure_loaded(ref_id, name)?;
        Ok(status == WindowStatus::Ready)
    }

    /// Filters and walks one record.
    ///
    /// # Returns
    /// `None` if the record was walked, otherwise why it was skipped.
    ///
    /// # Errors
    /// Returns an error if the reference cannot be loaded or the record cannot be walked.
    pub fn process(&mut self, record: &AlignedRecord) -> Result<Option<SkipReason>> {
        self.counts.total_records += 1;
        let skip = self.filter_and_walk(record)?;
        if let Some(reason) = skip {
            self.counts.record_skip(reason);
        }
        Ok(skip)
    }

    fn filter_and_walk(&mut self, record: &AlignedRecord) -> Result<Option<SkipReason>> {
        let Some(ref_id) = record.reference_sequence_id else {
            return Ok(Some(SkipReason::Unmapped));
        };
        if is_hard_clipped(record) {
            return Ok(Some(SkipReason::HardClipped));
        }
        if self.config.skip_soft_clipped && is_soft_clipped(record) {
            return Ok(Some(SkipReason::SoftClipped));
        }
        if record.bases.is_empty() {
            return Ok(Some(SkipReason::NoBases));
        }
        if !self.resolve_reference(record, ref_id)? {
            return Ok(Some(SkipReason::AlternateContig));
        }

        let reference = self.window.sequence();
        let footprint = Footprint::of(record);
        if footprint.is_near_start(self.config.edge_margin) {
            return Ok(Some(SkipReason::NearReferenceStart));
        }
        if footprint.is_near_end(reference.len(), self.config.edge_margin) {
            return Ok(Some(SkipReason::NearReferenceEnd));
        }

        let observed = self.walker.walk(record, reference, &mut self.matrix)?;
        self.counts.observations += observed as u64;
        match record.strand {
            Strand::Forward => self.counts.forward += 1,
            Strand::Reverse => self.counts.reverse += 1,
        }
        Ok(None)
    }

    /// Processes every record, logging progress and writing interim reports along the way.
    ///
    /// Interim report failures are logged and otherwise ignored.
    ///
    /// # Errors
    /// Returns the first error from the record source or from [`process`](Self::process).
    pub fn run<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<AlignedRecord>>,
    {
        for result in records {
            let record = result?;
            self.process(&record)?;
            self.progress.add(1);

            let total = self.counts.total_records;
            if let Some(interim) = self.interim.as_ref().filter(|i| i.is_due(total)) {
                debug!("Writing interim report after {total} records");
                if let Err(e) = interim.write(&self.matrix) {
                    warn!("{e:#}");
                }
            }
        }
        self.progress.log_final();
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn counts(&self) -> &FilterCounts {
        &self.counts
    }

    #[must_use]
    pub fn window(&self) -> &ReferenceWindow<P> {
        &self.window
    }

    /// Consumes the pipeline, returning the matrix and the filter counts.
    #[must_use]
    pub fn finish(self) -> (ConfusionMatrix, FilterCounts) {
        (self.matrix, self.counts)
    }
}
