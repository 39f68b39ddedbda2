//! CIGAR walking.
//!
//! Walks the CIGAR of an [`AlignedRecord`] against a reference sequence and reports, for every
//! matched or soft-clipped base, which reference base the sequencer saw at which cycle and
//! what it called.
//!
//! Cycles are numbered from the physical start of the read. Forward-strand records are walked
//! left to right starting at the footprint start. Reverse-strand records are walked right to
//! left starting at the footprint end, with the CIGAR processed in reverse and the query bases
//! read from the last base backwards. No complementing is applied on the reverse strand.
//!
//! Insertions consume cycles and query bases without being observed; deletions consume
//! reference bases only. Walking stops as soon as the cycle reaches the configured maximum.

use crate::base;
use crate::clip::{footprint_end, footprint_start};
use crate::errors::{BcqcError, Result};
use crate::record::{AlignedRecord, CigarKind, CigarOp};

/// One observed base: the true reference base and the emitted base at a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    /// 0-based sequencing cycle
    pub cycle: usize,
    /// Dense index of the reference base
    pub ref_base: usize,
    /// Dense index of the base reported by the sequencer
    pub read_base: usize,
}

impl Observation {
    #[must_use]
    pub const fn new(cycle: usize, ref_base: usize, read_base: usize) -> Self {
        Self { cycle, ref_base, read_base }
    }
}

/// Receives observations from a [`CigarWalker`].
pub trait ObservationSink {
    fn observe(&mut self, observation: Observation);
}

impl ObservationSink for Vec<Observation> {
    fn observe(&mut self, observation: Observation) {
        self.push(observation);
    }
}

/// Direction of traversal along the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    const fn step(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// The three synchronised walk positions. Only the `consume_*` methods move them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    cycle: usize,
    query: i64,
    reference: i64,
    direction: Direction,
}

impl Cursor {
    fn start(record: &AlignedRecord, direction: Direction) -> Self {
        match direction {
            Direction::Forward => {
                Self { cycle: 0, query: 0, reference: footprint_start(record), direction }
            }
            Direction::Reverse => Self {
                cycle: 0,
                query: record.bases.len() as i64 - 1,
                reference: footprint_end(record),
                direction,
            },
        }
    }

    /// One aligned base: moves all three positions.
    fn consume_aligned(&mut self) {
        let step = self.direction.step();
        self.query += step;
        self.reference += step;
        self.cycle += 1;
    }

    fn consume_insertion(&mut self, len: usize) {
        self.query += self.direction.step() * len as i64;
        self.cycle += len;
    }

    fn consume_deletion(&mut self, len: usize) {
        self.reference += self.direction.step() * len as i64;
    }
}

/// Converts a signed walk coordinate into an index into a sequence of `length` bases.
fn checked_index(
    what: &'static str,
    coordinate: i64,
    length: usize,
    record: &AlignedRecord,
) -> Result<usize> {
    match usize::try_from(coordinate) {
        Ok(index) if index < length => Ok(index),
        _ => Err(BcqcError::CoordinateOutOfBounds {
            what,
            coordinate,
            length,
            record: record.label().to_string(),
        }),
    }
}

/// Walks records against a reference, truncating each read at `max_cycles`.
#[derive(Debug, Clone, Copy)]
pub struct CigarWalker {
    max_cycles: usize,
}

impl CigarWalker {
    #[must_use]
    pub fn new(max_cycles: usize) -> Self {
        Self { max_cycles }
    }

    #[must_use]
    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Walks `record` against `reference`, sending each observation to `sink`.
    ///
    /// Hard-clipped records must be filtered out before walking.
    ///
    /// # Returns
    /// The number of observations emitted.
    ///
    /// # Errors
    /// - [`BcqcError::InvalidCigarOperation`] for a hard clip (or any op the walker does not
    ///   handle)
    /// - [`BcqcError::InvalidBase`] if a reference or query base is not A/C/G/T/N
    /// - [`BcqcError::CoordinateOutOfBounds`] if the alignment runs off the reference or the
    ///   query sequence
    ///
    /// Observations emitted before an error are not retracted.
    pub fn walk<S: ObservationSink + ?Sized>(
        &self,
        record: &AlignedRecord,
        reference: &[u8],
        sink: &mut S,
    ) -> Result<usize> {
        let ops = record.cigar.ops();
        if record.strand.is_reverse() {
            self.walk_ops(record, ops.iter().rev(), Direction::Reverse, reference, sink)
        } else {
            self.walk_ops(record, ops.iter(), Direction::Forward, reference, sink)
        }
    }

    fn walk_ops<'a, S: ObservationSink + ?Sized>(
        &self,
        record: &AlignedRecord,
        ops: impl Iterator<Item = &'a CigarOp>,
        direction: Direction,
        reference: &[u8],
        sink: &mut S,
    ) -> Result<usize> {
        let mut cursor = Cursor::start(record, direction);
        let mut observed = 0;

        for op in ops {
            match op.kind {
                CigarKind::Match | CigarKind::SoftClip => {
                    for _ in 0..op.len {
                        if cursor.cycle >= self.max_cycles {
                            return Ok(observed);
                        }
                        let ref_index =
                            checked_index("Reference", cursor.reference, reference.len(), record)?;
                        let query_index =
                            checked_index("Query", cursor.query, record.bases.len(), record)?;
                        let ref_base = base::decode_at(reference, ref_index)?;
                        let read_base = base::decode_at(&record.bases, query_index)?;
                        sink.observe(Observation::new(cursor.cycle, ref_base, read_base));
                        observed += 1;
                        cursor.consume_aligned();
                    }
                }
                CigarKind::Insertion => cursor.consume_insertion(op.len),
                CigarKind::Deletion => cursor.consume_deletion(op.len),
                CigarKind::HardClip => {
                    return Err(BcqcError::InvalidCigarOperation {
                        op: op.to_string(),
                        record: record.label().to_string(),
                    });
                }
            }
        }

        Ok(observed)
    }
}
