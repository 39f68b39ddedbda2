//! Reference sequence access.
//!
//! A [`ReferenceProvider`] loads the full sequence of one chromosome by name. Two providers
//! are available:
//!
//! - [`FastaDirectory`]: one FASTA file per chromosome, named `<chrom>.fa`, `<chrom>.fasta`,
//!   `<chrom>.fa.gz` or `<chrom>.fasta.gz`
//! - [`FastaFile`]: a single multi-record FASTA. When a `.fai` index is present sequences are
//!   read as raw bytes at the indexed offset, otherwise the file is scanned sequentially.
//!
//! [`ReferenceWindow`] holds the one chromosome that is currently in memory and swaps it as
//! the alignment stream moves between chromosomes.

use crate::errors::BcqcError;
use anyhow::{Context, Result};
use log::debug;
use noodles::fasta;
use noodles::fasta::fai;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// File extensions tried, in order, when looking up a chromosome in a FASTA directory.
pub const FASTA_EXTENSIONS: [&str; 4] = ["fa", "fasta", "fa.gz", "fasta.gz"];

/// Contigs whose names contain this character are treated as alternate contigs and never
/// loaded.
pub const ALTERNATE_CONTIG_MARKER: char = '_';

/// Returns true if `name` looks like an alternate, unplaced or decoy contig.
#[must_use]
pub fn is_alternate_contig(name: &str) -> bool {
    name.contains(ALTERNATE_CONTIG_MARKER)
}

/// Loads whole chromosome sequences by name.
pub trait ReferenceProvider {
    /// Returns the full sequence of chromosome `name`.
    ///
    /// # Errors
    /// Returns an error if the chromosome cannot be found or read.
    fn load(&mut self, name: &str) -> Result<Vec<u8>>;
}

/// Read a sequence from a FASTA file using FAI index metadata.
///
/// Reads the whole sequence span in one call and strips line terminators in memory. A
/// sequence that fits on one line is returned as read.
fn read_sequence_raw(file: &mut File, record: &fai::Record) -> Result<Vec<u8>> {
    let line_bases = record.line_bases() as usize;
    let line_width = record.line_width() as usize;
    let seq_len = record.length() as usize;

    file.seek(SeekFrom::Start(record.offset()))?;

    if seq_len <= line_bases {
        let mut sequence = vec![0u8; seq_len];
        file.read_exact(&mut sequence)?;
        return Ok(sequence);
    }

    let complete_lines = seq_len / line_bases;
    let remaining_bases = seq_len % line_bases;

    // The final line has no terminator within the span
    let total_bytes = if remaining_bases > 0 {
        complete_lines * line_width + remaining_bases
    } else {
        (complete_lines - 1) * line_width + line_bases
    };

    let mut raw_bytes = vec![0u8; total_bytes];
    file.read_exact(&mut raw_bytes)?;

    let mut sequence = Vec::with_capacity(seq_len);
    for line in raw_bytes.chunks(line_width) {
        let bases = line.len().min(line_bases).min(seq_len - sequence.len());
        sequence.extend_from_slice(&line[..bases]);
    }

    Ok(sequence)
}

/// Find FAI index path for a FASTA file.
fn find_fai_path(fasta_path: &Path) -> Option<PathBuf> {
    let appended = PathBuf::from(format!("{}.fai", fasta_path.display()));
    if appended.exists() {
        return Some(appended);
    }

    let replaced = fasta_path.with_extension("fai");
    if replaced.exists() {
        return Some(replaced);
    }

    None
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz" || ext == "bgz")
}

/// A single (possibly multi-record) FASTA file.
#[derive(Debug)]
pub struct FastaFile {
    path: PathBuf,
    index: Option<fai::Index>,
}

impl FastaFile {
    /// Opens a FASTA file, reading its `.fai` index if one is found next to it.
    ///
    /// The index is ignored for compressed files.
    ///
    /// # Errors
    /// Returns an error if the file does not exist or the index cannot be parsed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BcqcError::InvalidFileFormat {
                file_type: "Reference FASTA".to_string(),
                path: path.display().to_string(),
                reason: "File does not exist".to_string(),
            }
            .into());
        }

        let index = match find_fai_path(path) {
            Some(fai_path) if !is_gzipped(path) => {
                debug!("Using FAI index for fast loading: {}", fai_path.display());
                let index = fai::fs::read(&fai_path)
                    .with_context(|| format!("Failed to read FAI index: {}", fai_path.display()))?;
                Some(index)
            }
            _ => None,
        };

        Ok(Self { path: path.to_path_buf(), index })
    }

    /// Path to the FASTA file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if sequences are read through a `.fai` index.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Loads the first record in the file, returning its name and sequence.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds no records.
    pub fn load_first(&self) -> Result<(String, Vec<u8>)> {
        let mut reader = fasta::io::reader::Builder
            .build_from_path(&self.path)
            .with_context(|| format!("Failed to open FASTA: {}", self.path.display()))?;

        match reader.records().next() {
            Some(result) => {
                let record = result
                    .with_context(|| format!("Failed to read FASTA: {}", self.path.display()))?;
                let name = std::str::from_utf8(record.name())?.to_string();
                let sequence: &[u8] = record.sequence().as_ref();
                Ok((name, sequence.to_vec()))
            }
            None => Err(BcqcError::InvalidFileFormat {
                file_type: "Reference FASTA".to_string(),
                path: self.path.display().to_string(),
                reason: "File contains no sequences".to_string(),
            }
            .into()),
        }
    }

    fn load_indexed(&self, index: &fai::Index, name: &str) -> Result<Vec<u8>> {
        let records: &[fai::Record] = index.as_ref();
        let record = records
            .iter()
            .find(|r| {
                let record_name: &[u8] = r.name().as_ref();
                record_name == name.as_bytes()
            })
            .ok_or_else(|| BcqcError::ReferenceNotFound { ref_name: name.to_string() })?;

        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open FASTA: {}", self.path.display()))?;
        read_sequence_raw(&mut file, record)
            .with_context(|| format!("Failed to read '{name}' from {}", self.path.display()))
    }

    fn load_sequential(&self, name: &str) -> Result<Vec<u8>> {
        let mut reader = fasta::io::reader::Builder
            .build_from_path(&self.path)
            .with_context(|| format!("Failed to open FASTA: {}", self.path.display()))?;

        for result in reader.records() {
            let record = result
                .with_context(|| format!("Failed to read FASTA: {}", self.path.display()))?;
            let record_name: &[u8] = record.name().as_ref();
            if record_name == name.as_bytes() {
                let sequence: &[u8] = record.sequence().as_ref();
                return Ok(sequence.to_vec());
            }
        }

        Err(BcqcError::ReferenceNotFound { ref_name: name.to_string() }.into())
    }
}

impl ReferenceProvider for FastaFile {
    fn load(&mut self, name: &str) -> Result<Vec<u8>> {
        match &self.index {
            Some(index) => self.load_indexed(index, name),
            None => self.load_sequential(name),
        }
    }
}

/// A directory holding one FASTA file per chromosome.
#[derive(Debug, Clone)]
pub struct FastaDirectory {
    dir: PathBuf,
}

impl FastaDirectory {
    /// # Errors
    /// Returns an error if `dir` is not a directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BcqcError::InvalidParameter {
                parameter: "reference directory".to_string(),
                reason: format!("{} is not a directory", dir.display()),
            }
            .into());
        }
        Ok(Self { dir: dir.to_path_buf() })
    }

    /// Returns the first existing `<dir>/<name>.<ext>` over [`FASTA_EXTENSIONS`].
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        FASTA_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl ReferenceProvider for FastaDirectory {
    /// Loads `name` from its own file. The record named `name` is used if present, otherwise
    /// the file's first record.
    fn load(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = self
            .find(name)
            .ok_or_else(|| BcqcError::ReferenceNotFound { ref_name: name.to_string() })?;
        debug!("Loading {name} from {}", path.display());

        let mut fasta = FastaFile::new(&path)?;
        match fasta.load(name) {
            Ok(sequence) => Ok(sequence),
            Err(e)
                if matches!(
                    e.downcast_ref::<BcqcError>(),
                    Some(BcqcError::ReferenceNotFound { .. })
                ) =>
            {
                fasta.load_first().map(|(_, sequence)| sequence)
            }
            Err(e) => Err(e),
        }
    }
}

/// Outcome of [`ReferenceWindow::ensure_loaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// The requested chromosome is in the window.
    Ready,
    /// The chromosome is an alternate contig; the window was left unchanged.
    AlternateContig,
}

/// The single chromosome currently held in memory.
///
/// The window is reloaded only when the reference id changes; alternate contigs are refused
/// without touching the current sequence.
pub struct ReferenceWindow<P> {
    provider: P,
    current_id: Option<usize>,
    current_name: Option<String>,
    sequence: Vec<u8>,
    loads: usize,
}

impl<P: ReferenceProvider> ReferenceWindow<P> {
    /// Creates an empty window.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider, current_id: None, current_name: None, sequence: Vec::new(), loads: 0 }
    }

    /// Creates a window that already holds `sequence`, not associated with any reference id.
    #[must_use]
    pub fn preloaded(provider: P, name: impl Into<String>, sequence: Vec<u8>) -> Self {
        Self { provider, current_id: None, current_name: Some(name.into()), sequence, loads: 0 }
    }

    /// Makes sure chromosome `ref_id` (named `name`) is in the window.
    ///
    /// Does nothing when `ref_id` is already loaded. Alternate contigs return
    /// [`WindowStatus::AlternateContig`] and leave the window as it was.
    ///
    /// # Errors
    /// Returns an error if the provider fails; the window is unchanged in that case.
    pub fn ensure_loaded(&mut self, ref_id: usize, name: &str) -> Result<WindowStatus> {
        if self.current_id == Some(ref_id) {
            return Ok(WindowStatus::Ready);
        }
        if is_alternate_contig(name) {
            return Ok(WindowStatus::AlternateContig);
        }

        debug!("Switching reference window to {name}");
        let sequence = self
            .provider
            .load(name)
            .with_context(|| format!("Failed to load reference sequence '{name}'"))?;
        self.loads += 1;
        self.sequence = sequence;
        self.current_id = Some(ref_id);
        self.current_name = Some(name.to_string());
        Ok(WindowStatus::Ready)
    }

    /// The sequence currently in the window (empty before the first load).
    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[must_use]
    pub fn current_id(&self) -> Option<usize> {
        self.current_id
    }

    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    /// Number of times the provider has been asked for a sequence.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads
    }
}
