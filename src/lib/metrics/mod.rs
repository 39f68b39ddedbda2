//! Metrics types and reporting for bcqc operations.
//!
//! - [`confusion`] - Per-cycle error profile and long-format confusion metrics
//! - [`writer`] - Metrics file I/O utilities
//!
//! # Traits
//!
//! - [`Metric`] - Core trait for serializable metrics
//! - [`ProcessingMetrics`] - Common interface for input/output metrics

pub mod confusion;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use confusion::{ConfusionMetric, CycleErrorMetric};
pub use writer::write_metrics;

/// Number of decimal places used for float metrics and the confusion report.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// Non-finite values are written the way Rust prints them (`NaN`, `inf`).
///
/// # Example
/// ```
/// use bcqc_lib::metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// assert_eq!(format_float(0.0), "0.000000");
/// assert_eq!(format_float(f64::NAN), "NaN");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type.
    ///
    /// Used in error messages and logging when writing metrics files.
    fn metric_name() -> &'static str;
}

/// Common interface for metrics that track processing pipeline counts.
pub trait ProcessingMetrics {
    /// Total number of input records processed.
    fn total_input(&self) -> u64;

    /// Total number of records that contributed to the output.
    fn total_output(&self) -> u64;

    /// Total number of records filtered out.
    fn total_filtered(&self) -> u64;

    /// Processing efficiency as a percentage (output / input * 100).
    fn efficiency(&self) -> f64 {
        if self.total_input() == 0 {
            0.0
        } else {
            self.total_output() as f64 / self.total_input() as f64 * 100.0
        }
    }
}
