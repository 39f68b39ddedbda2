//! Metrics for the `confusion` command.
//!
//! Both metric types are derived from a finished
//! [`ConfusionMatrix`](crate::matrix::ConfusionMatrix): [`CycleErrorMetric`] summarises each
//! cycle in one row, while [`ConfusionMetric`] is the long-format form of the report with one
//! row per `(cycle, reference base, read base)` cell.

use serde::{Deserialize, Serialize};

use super::Metric;

/// Per-cycle base-calling error summary.
///
/// Only positions whose reference base is A, C, G or T are counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleErrorMetric {
    /// 0-based sequencing cycle
    pub cycle: usize,
    /// Aligned bases observed at this cycle
    pub bases: u64,
    /// Bases called as a different A/C/G/T than the reference
    pub mismatches: u64,
    /// Bases called as N
    pub no_calls: u64,
    /// `mismatches / bases`, NaN when no bases were observed
    pub error_rate: f64,
    /// `no_calls / bases`, NaN when no bases were observed
    pub no_call_rate: f64,
}

impl CycleErrorMetric {
    /// Creates a metric for `cycle` and derives the rates from the counts.
    #[must_use]
    pub fn new(cycle: usize, bases: u64, mismatches: u64, no_calls: u64) -> Self {
        let (error_rate, no_call_rate) = if bases == 0 {
            (f64::NAN, f64::NAN)
        } else {
            (mismatches as f64 / bases as f64, no_calls as f64 / bases as f64)
        };
        Self { cycle, bases, mismatches, no_calls, error_rate, no_call_rate }
    }
}

impl Default for CycleErrorMetric {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl Metric for CycleErrorMetric {
    fn metric_name() -> &'static str {
        "cycle error"
    }
}

/// One cell of the confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMetric {
    /// 0-based sequencing cycle
    pub cycle: usize,
    /// The reference base (A, C, G or T)
    pub ref_base: char,
    /// The base reported by the sequencer (A, C, G, T or N)
    pub read_base: char,
    /// Number of times `ref_base` was read as `read_base` at this cycle
    pub count: u64,
    /// Number of times `ref_base` was observed at this cycle
    pub total: u64,
    /// `count / total`, NaN when `total` is zero
    pub fraction: f64,
}

impl Default for ConfusionMetric {
    fn default() -> Self {
        Self { cycle: 0, ref_base: 'A', read_base: 'A', count: 0, total: 0, fraction: f64::NAN }
    }
}

impl Metric for ConfusionMetric {
    fn metric_name() -> &'static str {
        "base confusion"
    }
}
