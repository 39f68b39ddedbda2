//! The base-calling confusion matrix.
//!
//! [`ConfusionMatrix`] accumulates, for every sequencing cycle, how often each reference base
//! was called as each of A/C/G/T/N. It holds two dense counter arrays that are allocated once
//! and never resized:
//!
//! - `joint[ref][read][cycle]`, `5 x 5 x L`
//! - `total[ref][cycle]`, `5 x L`
//!
//! Both are only ever changed together by [`ConfusionMatrix::observe`], so
//! `total[r][c] == sum over e of joint[r][e][c]` holds at all times.

use std::io::{self, Write};

use crate::base::{BASES, NO_CALL_INDEX, NUM_BASES, NUM_REF_BASES};
use crate::errors::{BcqcError, Result};
use crate::metrics::{ConfusionMetric, CycleErrorMetric, format_float};
use crate::walker::{Observation, ObservationSink};

/// Per-cycle counts of reference base versus called base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    max_cycles: usize,
    joint: Vec<u64>,
    total: Vec<u64>,
    observations: u64,
}

impl ConfusionMatrix {
    /// Creates an empty matrix covering cycles `0..max_cycles`.
    #[must_use]
    pub fn new(max_cycles: usize) -> Self {
        Self {
            max_cycles,
            joint: vec![0; NUM_BASES * NUM_BASES * max_cycles],
            total: vec![0; NUM_BASES * max_cycles],
            observations: 0,
        }
    }

    #[inline]
    fn joint_index(&self, ref_base: usize, read_base: usize, cycle: usize) -> usize {
        (ref_base * NUM_BASES + read_base) * self.max_cycles + cycle
    }

    #[inline]
    fn total_index(&self, ref_base: usize, cycle: usize) -> usize {
        ref_base * self.max_cycles + cycle
    }

    /// Records that `ref_base` was called as `read_base` at `cycle`.
    ///
    /// # Panics
    /// Panics if any index is out of range; callers only pass decoded bases and cycles below
    /// [`max_cycles`](Self::max_cycles).
    #[inline]
    pub fn observe(&mut self, cycle: usize, ref_base: usize, read_base: usize) {
        debug_assert!(cycle < self.max_cycles, "cycle {cycle} >= {}", self.max_cycles);
        debug_assert!(ref_base < NUM_BASES && read_base < NUM_BASES);
        let j = self.joint_index(ref_base, read_base, cycle);
        let t = self.total_index(ref_base, cycle);
        self.joint[j] += 1;
        self.total[t] += 1;
        self.observations += 1;
    }

    /// Number of cycles tracked.
    #[must_use]
    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Total number of observations recorded.
    #[must_use]
    pub fn num_observations(&self) -> u64 {
        self.observations
    }

    /// Number of times `ref_base` was called as `read_base` at `cycle`.
    #[must_use]
    pub fn joint(&self, ref_base: usize, read_base: usize, cycle: usize) -> u64 {
        self.joint[self.joint_index(ref_base, read_base, cycle)]
    }

    /// Number of times `ref_base` was observed at `cycle`.
    #[must_use]
    pub fn total(&self, ref_base: usize, cycle: usize) -> u64 {
        self.total[self.total_index(ref_base, cycle)]
    }

    /// Fraction of `ref_base` observations at `cycle` called as `read_base`.
    ///
    /// Returns NaN when `ref_base` was never observed at `cycle`.
    #[must_use]
    pub fn rate(&self, ref_base: usize, read_base: usize, cycle: usize) -> f64 {
        self.joint(ref_base, read_base, cycle) as f64 / self.total(ref_base, cycle) as f64
    }

    /// Adds all counts from `other` into this matrix.
    ///
    /// # Errors
    /// Returns [`BcqcError::InvalidParameter`] if the matrices track different cycle counts.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<()> {
        if other.max_cycles != self.max_cycles {
            return Err(BcqcError::InvalidParameter {
                parameter: "max_cycles".to_string(),
                reason: format!(
                    "cannot merge a matrix of {} cycles into one of {} cycles",
                    other.max_cycles, self.max_cycles
                ),
            });
        }
        self.joint.iter_mut().zip(&other.joint).for_each(|(a, b)| *a += b);
        self.total.iter_mut().zip(&other.total).for_each(|(a, b)| *a += b);
        self.observations += other.observations;
        Ok(())
    }

    /// Writes the normalised report.
    ///
    /// For each reference base A, C, G and T a line naming the base is followed by one line per
    /// called base A, C, G, T and N: `\t-> X` and then the rate at every cycle, each preceded
    /// by a single space.
    ///
    /// # Errors
    /// Returns any error from the underlying writer.
    pub fn report<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for (ref_base, &ref_char) in BASES.iter().enumerate().take(NUM_REF_BASES) {
            writeln!(writer, "{}", char::from(ref_char))?;
            for (read_base, &read_char) in BASES.iter().enumerate() {
                write!(writer, "\t-> {}", char::from(read_char))?;
                for cycle in 0..self.max_cycles {
                    write!(writer, " {}", format_float(self.rate(ref_base, read_base, cycle)))?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    /// Summarises each cycle over reference bases A, C, G and T.
    #[must_use]
    pub fn error_profile(&self) -> Vec<CycleErrorMetric> {
        (0..self.max_cycles)
            .map(|cycle| {
                let mut bases = 0;
                let mut mismatches = 0;
                let mut no_calls = 0;
                for ref_base in 0..NUM_REF_BASES {
                    bases += self.total(ref_base, cycle);
                    no_calls += self.joint(ref_base, NO_CALL_INDEX, cycle);
                    mismatches += (0..NUM_REF_BASES)
                        .filter(|&read_base| read_base != ref_base)
                        .map(|read_base| self.joint(ref_base, read_base, cycle))
                        .sum::<u64>();
                }
                CycleErrorMetric::new(cycle, bases, mismatches, no_calls)
            })
            .collect()
    }

    /// The report in long format: one row per cycle, reference base (A/C/G/T) and called base.
    #[must_use]
    pub fn confusion_metrics(&self) -> Vec<ConfusionMetric> {
        let mut metrics = Vec::with_capacity(self.max_cycles * NUM_REF_BASES * NUM_BASES);
        for cycle in 0..self.max_cycles {
            for (ref_base, &ref_char) in BASES.iter().enumerate().take(NUM_REF_BASES) {
                for (read_base, &read_char) in BASES.iter().enumerate() {
                    metrics.push(ConfusionMetric {
                        cycle,
                        ref_base: char::from(ref_char),
                        read_base: char::from(read_char),
                        count: self.joint(ref_base, read_base, cycle),
                        total: self.total(ref_base, cycle),
                        fraction: self.rate(ref_base, read_base, cycle),
                    });
                }
            }
        }
        metrics
    }
}

impl ObservationSink for ConfusionMatrix {
    #[inline]
    fn observe(&mut self, observation: Observation) {
        let Observation { cycle, ref_base, read_base } = observation;
        ConfusionMatrix::observe(self, cycle, ref_base, read_base);
    }
}
