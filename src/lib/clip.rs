//! Clip classification and alignment footprints.
//!
//! The footprint of a record is the inclusive reference span it covers once soft-clipped
//! flanks are projected onto the reference. Both the edge-proximity filter and the starting
//! cursor of the CIGAR walker are derived from it, so the two always agree on coordinates.

use crate::record::{AlignedRecord, CigarKind, CigarOp};

/// Inclusive reference-coordinate span of a record, soft clips included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// Leftmost reference coordinate (0-based, inclusive); may be negative
    pub start: i64,
    /// Rightmost reference coordinate (0-based, inclusive)
    pub end: i64,
}

impl Footprint {
    /// Computes the footprint of a record.
    #[must_use]
    pub fn of(record: &AlignedRecord) -> Self {
        Self { start: footprint_start(record), end: footprint_end(record) }
    }

    /// Returns true if the footprint starts within `margin` bases of the reference start.
    #[must_use]
    pub fn is_near_start(&self, margin: usize) -> bool {
        self.start < margin as i64
    }

    /// Returns true if the footprint ends within `margin` bases of the end of a reference of
    /// `reference_len` bases.
    #[must_use]
    pub fn is_near_end(&self, reference_len: usize, margin: usize) -> bool {
        self.end > reference_len as i64 - margin as i64
    }
}

/// Returns true if any operation is a hard clip.
#[must_use]
pub fn is_hard_clipped(record: &AlignedRecord) -> bool {
    record.cigar.ops().iter().any(|op| op.kind == CigarKind::HardClip)
}

/// Returns true if any operation is a soft clip.
#[must_use]
pub fn is_soft_clipped(record: &AlignedRecord) -> bool {
    record.cigar.ops().iter().any(|op| op.kind == CigarKind::SoftClip)
}

/// Number of reference bases consumed by the alignment (M and D operations).
#[must_use]
pub fn reference_length(record: &AlignedRecord) -> usize {
    record
        .cigar
        .ops()
        .iter()
        .filter(|op| matches!(op.kind, CigarKind::Match | CigarKind::Deletion))
        .map(|op| op.len)
        .sum()
}

/// Length of the soft clip adjacent to the alignment, ignoring any hard clips outside it.
fn flank_soft_clip<'a>(mut ops: impl Iterator<Item = &'a CigarOp>) -> usize {
    match ops.find(|op| op.kind != CigarKind::HardClip) {
        Some(op) if op.kind == CigarKind::SoftClip => op.len,
        _ => 0,
    }
}

/// Inclusive reference coordinate of the leftmost base, including a leading soft clip.
#[must_use]
pub fn footprint_start(record: &AlignedRecord) -> i64 {
    record.position - flank_soft_clip(record.cigar.ops().iter()) as i64
}

/// Inclusive reference coordinate of the rightmost base, including a trailing soft clip.
///
/// The exclusive alignment end (`position + reference_length`) is converted to the
/// inclusive last aligned coordinate before the trailing clip is added.
#[must_use]
pub fn footprint_end(record: &AlignedRecord) -> i64 {
    let last_aligned = record.position + reference_length(record) as i64 - 1;
    last_aligned + flank_soft_clip(record.cigar.ops().iter().rev()) as i64
}
