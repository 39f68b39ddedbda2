//! Cluster intensity files (CIF).
//!
//! A CIF holds raw per-channel intensities for a tile of clusters over a range of cycles:
//!
//! | Offset | Size | Field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 3    | magic `CIF`                            |
//! | 3      | 1    | version                                |
//! | 4      | 1    | sample width in bytes (1, 2 or 4)      |
//! | 5      | 2    | first cycle                            |
//! | 7      | 2    | number of cycles                       |
//! | 9      | 4    | number of clusters                     |
//! | 13     | ...  | `4 x clusters x cycles` signed samples |
//!
//! All integers are little-endian. Samples are laid out by cycle, then channel, then cluster.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use anyhow::Context;

use crate::errors::{BcqcError, Result};

/// Magic bytes at the start of every CIF.
pub const CIF_MAGIC: &[u8; 3] = b"CIF";

/// Number of intensity channels per cluster and cycle.
pub const NUM_CHANNELS: usize = 4;

/// Size of the fixed header including the magic.
pub const HEADER_LEN: usize = 13;

/// Width of one intensity sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    One,
    Two,
    Four,
}

impl SampleWidth {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            SampleWidth::One => 1,
            SampleWidth::Two => 2,
            SampleWidth::Four => 4,
        }
    }
}

impl TryFrom<u8> for SampleWidth {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(SampleWidth::One),
            2 => Ok(SampleWidth::Two),
            4 => Ok(SampleWidth::Four),
            other => Err(other),
        }
    }
}

/// The fixed-size CIF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CifHeader {
    pub version: u8,
    pub sample_width: SampleWidth,
    pub first_cycle: u16,
    pub num_cycles: u16,
    pub num_clusters: u32,
}

impl CifHeader {
    /// Number of samples in the data block.
    #[must_use]
    pub fn num_samples(&self) -> Option<usize> {
        NUM_CHANNELS
            .checked_mul(usize::from(self.num_cycles))?
            .checked_mul(usize::try_from(self.num_clusters).ok()?)
    }
}

impl fmt::Display for CifHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CIF")?;
        writeln!(f, "\tVersion:     {}", self.version)?;
        writeln!(f, "\tData size:   {}", self.sample_width.bytes())?;
        writeln!(f, "\tFirst cycle: {}", self.first_cycle)?;
        writeln!(f, "\t# cycles:    {}", self.num_cycles)?;
        write!(f, "\t# clusters:  {}", self.num_clusters)
    }
}

/// Decoded samples, stored at their declared width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intensities {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl Intensities {
    fn decode(width: SampleWidth, raw: &[u8]) -> Self {
        match width {
            SampleWidth::One => {
                Intensities::I8(raw.iter().map(|&b| i8::from_le_bytes([b])).collect())
            }
            SampleWidth::Two => Intensities::I16(
                raw.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect(),
            ),
            SampleWidth::Four => Intensities::I32(
                raw.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect(),
            ),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Intensities::I8(v) => v.len(),
            Intensities::I16(v) => v.len(),
            Intensities::I32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> f32 {
        match self {
            Intensities::I8(v) => f32::from(v[index]),
            Intensities::I16(v) => f32::from(v[index]),
            Intensities::I32(v) => v[index] as f32,
        }
    }
}

/// A fully decoded cluster intensity file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cif {
    header: CifHeader,
    intensities: Intensities,
}

fn format_error(source: &str, reason: impl Into<String>) -> BcqcError {
    BcqcError::InvalidFileFormat {
        file_type: "CIF".to_string(),
        path: source.to_string(),
        reason: reason.into(),
    }
}

/// `read_exact` that reports a short read as a format error.
fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], source: &str, what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => format_error(source, format!("truncated {what}")),
        _ => format_error(source, format!("failed to read {what}: {e}")),
    })
}

impl Cif {
    /// Reads only the header, leaving `reader` positioned at the start of the data block.
    ///
    /// `source` names the input in error messages.
    ///
    /// # Errors
    /// Returns [`BcqcError::InvalidFileFormat`] if the magic is missing, the header is short
    /// or the sample width is not 1, 2 or 4.
    pub fn read_header<R: Read>(reader: &mut R, source: &str) -> Result<CifHeader> {
        let mut buf = [0u8; HEADER_LEN];
        read_field(reader, &mut buf[..3], source, "magic")?;
        if &buf[..3] != CIF_MAGIC {
            return Err(format_error(source, "missing CIF characters in the first three bytes"));
        }
        read_field(reader, &mut buf[3..], source, "header")?;

        let sample_width = SampleWidth::try_from(buf[4])
            .map_err(|w| format_error(source, format!("invalid data size: {w}")))?;

        Ok(CifHeader {
            version: buf[3],
            sample_width,
            first_cycle: u16::from_le_bytes([buf[5], buf[6]]),
            num_cycles: u16::from_le_bytes([buf[7], buf[8]]),
            num_clusters: u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]),
        })
    }

    /// Reads a complete CIF from `reader`.
    ///
    /// # Errors
    /// Returns [`BcqcError::InvalidFileFormat`] for any malformed header field or a data block
    /// shorter than the header declares.
    pub fn from_reader<R: Read>(mut reader: R, source: &str) -> Result<Self> {
        let header = Self::read_header(&mut reader, source)?;
        let num_bytes = header
            .num_samples()
            .and_then(|n| n.checked_mul(header.sample_width.bytes()))
            .ok_or_else(|| format_error(source, "intensity block too large"))?;

        // The declared size is not trusted for allocation.
        let mut raw = Vec::new();
        reader
            .by_ref()
            .take(num_bytes as u64)
            .read_to_end(&mut raw)
            .map_err(|e| format_error(source, format!("failed to read intensities: {e}")))?;
        if raw.len() < num_bytes {
            return Err(format_error(source, "truncated intensities"));
        }

        Ok(Self { header, intensities: Intensities::decode(header.sample_width, &raw) })
    }

    /// Reads a complete CIF file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a valid CIF.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CIF file: {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file), &path.display().to_string())?)
    }

    #[must_use]
    pub fn header(&self) -> &CifHeader {
        &self.header
    }

    #[must_use]
    pub fn intensities(&self) -> &Intensities {
        &self.intensities
    }

    /// Intensity of `channel` for `cluster` at `cycle` (both 0-based within the file).
    ///
    /// # Panics
    /// Panics if any index is outside the file's dimensions.
    #[must_use]
    pub fn value(&self, cluster: usize, cycle: usize, channel: usize) -> f32 {
        let clusters = self.header.num_clusters as usize;
        assert!(
            cluster < clusters && cycle < usize::from(self.header.num_cycles) && channel < NUM_CHANNELS,
            "CIF index out of range: cluster {cluster}, cycle {cycle}, channel {channel}"
        );
        self.intensities.get(cycle * clusters * NUM_CHANNELS + channel * clusters + cluster)
    }

    /// Writes every intensity grouped by cluster.
    ///
    /// Each cluster is written as its index on a line of its own, followed by one line per
    /// channel: a tab, the channel index, a tab, then each cycle's value followed by a space.
    /// A blank line ends the output.
    ///
    /// # Errors
    /// Returns any error from the underlying writer.
    pub fn write_intensities<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        let cycles = usize::from(self.header.num_cycles);
        for cluster in 0..self.header.num_clusters as usize {
            writeln!(writer, "{cluster}")?;
            for channel in 0..NUM_CHANNELS {
                write!(writer, "\t{channel}\t")?;
                for cycle in 0..cycles {
                    write!(writer, "{} ", self.value(cluster, cycle, channel))?;
                }
                writeln!(writer)?;
            }
        }
        writeln!(writer)
    }
}

impl fmt::Display for Cif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.header.fmt(f)
    }
}
