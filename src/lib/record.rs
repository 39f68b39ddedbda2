//! Owned aligned-read records.
//!
//! [`AlignedRecord`] is the unit of work handed to the clip classifier and the CIGAR walker.
//! It holds only the fields the confusion matrix needs and is decoupled from noodles so
//! that the core can be driven from any alignment source (and from tests) without a BAM
//! header. Records are built from noodles [`RecordBuf`]s with [`AlignedRecord::from_record_buf`].

use std::fmt;
use std::str::FromStr;

use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::cigar::op::Kind;

use crate::errors::{BcqcError, Result};

/// Strand a read is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    /// Aligned to the forward strand of the reference.
    Forward,
    /// Aligned to the reverse strand of the reference.
    Reverse,
}

impl Strand {
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

/// The CIGAR operation kinds the confusion matrix understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarKind {
    /// Alignment match or mismatch (`M`).
    Match,
    /// Insertion to the reference (`I`).
    Insertion,
    /// Deletion from the reference (`D`).
    Deletion,
    /// Soft clip (`S`).
    SoftClip,
    /// Hard clip (`H`).
    HardClip,
}

impl CigarKind {
    /// The SAM character for this kind.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            CigarKind::Match => 'M',
            CigarKind::Insertion => 'I',
            CigarKind::Deletion => 'D',
            CigarKind::SoftClip => 'S',
            CigarKind::HardClip => 'H',
        }
    }

    /// Parses a SAM CIGAR character, returning `None` for kinds outside M/I/D/S/H.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(CigarKind::Match),
            'I' => Some(CigarKind::Insertion),
            'D' => Some(CigarKind::Deletion),
            'S' => Some(CigarKind::SoftClip),
            'H' => Some(CigarKind::HardClip),
            _ => None,
        }
    }
}

/// A single `(length, kind)` CIGAR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: usize,
}

impl CigarOp {
    #[must_use]
    pub const fn new(kind: CigarKind, len: usize) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// An ordered list of CIGAR operations in genome orientation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar(Vec<CigarOp>);

impl Cigar {
    #[must_use]
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CigarOp>> for Cigar {
    fn from(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("*");
        }
        for op in &self.0 {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = BcqcError;

    /// Parses a SAM CIGAR string such as `5M3I5M`. `*` parses to an empty CIGAR.
    fn from_str(s: &str) -> Result<Self> {
        if s == "*" {
            return Ok(Self::default());
        }

        let invalid = |op: String| BcqcError::InvalidCigarOperation { op, record: s.to_string() };

        let mut ops = Vec::new();
        let mut len: Option<usize> = None;
        for c in s.chars() {
            if let Some(digit) = c.to_digit(10) {
                let current = len.unwrap_or(0);
                len = Some(
                    current
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit as usize))
                        .ok_or_else(|| invalid(s.to_string()))?,
                );
            } else {
                let kind = CigarKind::from_char(c).ok_or_else(|| invalid(c.to_string()))?;
                let op_len = len.take().ok_or_else(|| invalid(c.to_string()))?;
                ops.push(CigarOp::new(kind, op_len));
            }
        }
        if len.is_some() {
            return Err(invalid(s.to_string()));
        }
        Ok(Self(ops))
    }
}

/// An aligned read as consumed by the confusion matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRecord {
    /// Read name, if known
    pub name: Option<String>,
    /// Reference sequence index; `None` for unmapped reads
    pub reference_sequence_id: Option<usize>,
    /// Leftmost aligned reference position (0-based)
    pub position: i64,
    /// Strand of the alignment
    pub strand: Strand,
    /// CIGAR operations in genome orientation
    pub cigar: Cigar,
    /// Query bases as stored in the record
    pub bases: Vec<u8>,
}

impl AlignedRecord {
    /// Creates a mapped record.
    #[must_use]
    pub fn new(
        reference_sequence_id: usize,
        position: i64,
        strand: Strand,
        cigar: Cigar,
        bases: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: None,
            reference_sequence_id: Some(reference_sequence_id),
            position,
            strand,
            cigar,
            bases: bases.into(),
        }
    }

    /// Creates an unmapped record holding only bases.
    #[must_use]
    pub fn unmapped(bases: impl Into<Vec<u8>>) -> Self {
        Self {
            name: None,
            reference_sequence_id: None,
            position: 0,
            strand: Strand::Forward,
            cigar: Cigar::default(),
            bases: bases.into(),
        }
    }

    /// Sets the read name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.reference_sequence_id.is_none()
    }

    /// A label for diagnostics: the read name, or `<unnamed>`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Converts a noodles record.
    ///
    /// A record is treated as unmapped when its unmapped flag is set or it lacks either a
    /// reference sequence id or an alignment start; its CIGAR is not inspected in that case.
    ///
    /// # Errors
    ///
    /// Returns [`BcqcError::InvalidCigarOperation`] if a mapped record uses a CIGAR operation
    /// other than M/I/D/S/H.
    pub fn from_record_buf(record: &RecordBuf) -> Result<Self> {
        let name = record.name().map(|n| String::from_utf8_lossy(n.as_ref()).into_owned());
        let bases = record.sequence().as_ref().to_vec();

        let mapped = if record.flags().is_unmapped() {
            None
        } else {
            record.reference_sequence_id().zip(record.alignment_start())
        };

        let Some((reference_sequence_id, start)) = mapped else {
            return Ok(Self { name, ..Self::unmapped(bases) });
        };

        let label = name.as_deref().unwrap_or("<unnamed>");
        let ops = record
            .cigar()
            .as_ref()
            .iter()
            .map(|op| {
                let kind = match op.kind() {
                    Kind::Match => CigarKind::Match,
                    Kind::Insertion => CigarKind::Insertion,
                    Kind::Deletion => CigarKind::Deletion,
                    Kind::SoftClip => CigarKind::SoftClip,
                    Kind::HardClip => CigarKind::HardClip,
                    other => {
                        return Err(BcqcError::InvalidCigarOperation {
                            op: format!("{other:?}"),
                            record: label.to_string(),
                        });
                    }
                };
                Ok(CigarOp::new(kind, op.len()))
            })
            .collect::<Result<Vec<_>>>()?;

        let strand =
            if record.flags().is_reverse_complemented() { Strand::Reverse } else { Strand::Forward };

        Ok(Self {
            name,
            reference_sequence_id: Some(reference_sequence_id),
            // noodles positions are 1-based
            position: usize::from(start) as i64 - 1,
            strand,
            cigar: Cigar(ops),
            bases,
        })
    }
}
