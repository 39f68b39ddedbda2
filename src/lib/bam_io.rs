//! BAM file input.
//!
//! [`create_bam_reader`] opens a BAM file (or standard input) with single- or multi-threaded
//! BGZF decompression. [`AlignmentSource`] wraps such a reader and its header, yielding
//! [`AlignedRecord`]s in file order and resolving reference ids to names.
//!
//! # Threading Model
//!
//! - **Single-threaded**: `threads=1` (lower overhead, good for small files)
//! - **Multi-threaded**: `threads>1` decompresses BGZF blocks on worker threads; records are
//!   still delivered in file order.

use anyhow::{Context, Result};
use noodles::bgzf::io::{MultithreadedReader, Reader as BgzfReader};
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use std::fs::File;
use std::io::{self, BufRead, Read};
use std::num::NonZero;
use std::path::Path;

use crate::record::AlignedRecord;

/// Boxed byte source feeding the BGZF reader.
type ByteSource = Box<dyn Read + Send>;

/// Enum wrapping single-threaded and multi-threaded BGZF readers.
pub enum BgzfReaderEnum {
    /// Single-threaded BGZF reader (lower overhead for small files)
    SingleThreaded(BgzfReader<ByteSource>),
    /// Multi-threaded BGZF reader (noodles built-in threading)
    MultiThreaded(MultithreadedReader<ByteSource>),
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.read(buf),
            BgzfReaderEnum::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.fill_buf(),
            BgzfReaderEnum::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.consume(amt),
            BgzfReaderEnum::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// Type alias for a BAM reader that supports both single and multi-threaded BGZF.
pub type BamReaderAuto = noodles::bam::io::Reader<BgzfReaderEnum>;

/// Check if a path refers to stdin (`-` or `/dev/stdin`).
///
/// ```
/// use bcqc_lib::bam_io::is_stdin_path;
/// use std::path::Path;
///
/// assert!(is_stdin_path(Path::new("-")));
/// assert!(is_stdin_path(Path::new("/dev/stdin")));
/// assert!(!is_stdin_path(Path::new("input.bam")));
/// ```
pub fn is_stdin_path<P: AsRef<Path>>(path: P) -> bool {
    let path_str = path.as_ref().to_string_lossy();
    path_str == "-" || path_str == "/dev/stdin"
}

/// Create a BAM reader with optional multi-threaded decompression.
///
/// # Arguments
/// * `path` - Path to the input BAM file, or `-` for stdin
/// * `threads` - Number of threads for BGZF decompression (1 = single-threaded)
///
/// # Returns
/// A tuple of (reader, header)
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be read
pub fn create_bam_reader<P: AsRef<Path>>(
    path: P,
    threads: usize,
) -> Result<(BamReaderAuto, Header)> {
    let path_ref = path.as_ref();
    let source: ByteSource = if is_stdin_path(path_ref) {
        Box::new(io::stdin())
    } else {
        Box::new(
            File::open(path_ref)
                .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?,
        )
    };

    let bgzf_reader = match NonZero::new(threads) {
        Some(worker_count) if threads > 1 => BgzfReaderEnum::MultiThreaded(
            MultithreadedReader::with_worker_count(worker_count, source),
        ),
        _ => BgzfReaderEnum::SingleThreaded(BgzfReader::new(source)),
    };

    let mut reader = noodles::bam::io::Reader::from(bgzf_reader);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;

    Ok((reader, header))
}

/// Sequential source of aligned records from a BAM file.
pub struct AlignmentSource {
    reader: BamReaderAuto,
    header: Header,
    record: RecordBuf,
    description: String,
}

impl AlignmentSource {
    /// Opens `path` and reads its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header cannot be read.
    pub fn open<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        let (reader, header) = create_bam_reader(&path, threads)?;
        Ok(Self {
            reader,
            header,
            record: RecordBuf::default(),
            description: path.as_ref().display().to_string(),
        })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Names of all reference sequences, indexed by reference id.
    #[must_use]
    pub fn reference_names(&self) -> Vec<String> {
        self.header.reference_sequences().keys().map(ToString::to_string).collect()
    }

    /// Name of the reference sequence with id `ref_id`.
    #[must_use]
    pub fn reference_name(&self, ref_id: usize) -> Option<String> {
        self.header.reference_sequences().get_index(ref_id).map(|(name, _)| name.to_string())
    }

    /// Reads the next record, or `None` at end of file.
    ///
    /// # Errors
    /// Returns an error if the record cannot be decoded or uses an unsupported CIGAR
    /// operation.
    pub fn next_record(&mut self) -> Result<Option<AlignedRecord>> {
        let n = self
            .reader
            .read_record_buf(&self.header, &mut self.record)
            .with_context(|| format!("Failed to read record from: {}", self.description))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(AlignedRecord::from_record_buf(&self.record)?))
    }
}

impl Iterator for AlignmentSource {
    type Item = Result<AlignedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
