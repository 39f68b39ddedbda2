//! Logging helpers for counts, rates and run summaries.

use std::time::{Duration, Instant};

use crate::metrics::ProcessingMetrics;
use crate::pipeline::{FilterCounts, SkipReason};

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use bcqc_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a percentage with specified decimal places.
///
/// # Arguments
///
/// * `value` - The fraction (0.0-1.0) to format as percentage
/// * `decimals` - Number of decimal places to include
///
/// # Returns
///
/// A string formatted as "XX.XX%" (e.g., "95.43%")
///
/// # Examples
///
/// ```
/// use bcqc_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(0.5, 1), "50.0%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form.
///
/// # Arguments
///
/// * `duration` - The duration to format
///
/// # Returns
///
/// A human-readable string (e.g., "2m 15s", "1h 30m", "45s")
///
/// # Examples
///
/// ```
/// use bcqc_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a rate (items per second) with appropriate units.
///
/// # Arguments
///
/// * `count` - Number of items processed
/// * `duration` - Time taken to process items
///
/// # Returns
///
/// A formatted rate string (e.g., "1,234 reads/s", "50 reads/min")
///
/// # Examples
///
/// ```
/// use bcqc_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 items/s");
/// assert_eq!(format_rate(600, Duration::from_secs(60)), "10 items/s");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} items/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} items/s", format_count(rate as u64))
    } else {
        let items_per_min = count as f64 / (secs / 60.0);
        format!("{items_per_min:.1} items/min")
    }
}

/// Logs a formatted summary of how records were filtered.
///
/// The always-relevant mapping filter is logged even when zero; the other reasons only when
/// they removed at least one record.
///
/// # Examples
///
/// ```no_run
/// use bcqc_lib::logging::log_filter_summary;
/// use bcqc_lib::pipeline::FilterCounts;
///
/// let mut counts = FilterCounts::default();
/// counts.total_records = 10_000;
/// counts.forward = 4_000;
/// counts.reverse = 3_500;
/// counts.unmapped = 2_500;
///
/// log_filter_summary(&counts);
/// ```
pub fn log_filter_summary(counts: &FilterCounts) {
    log::info!("Confusion Matrix Summary:");
    log::info!("  Total records: {}", format_count(counts.total_records));
    log::info!(
        "  Records walked: {} ({} forward, {} reverse)",
        format_count(counts.walked()),
        format_count(counts.forward),
        format_count(counts.reverse)
    );
    log::info!("  Bases observed: {}", format_count(counts.observations));

    if counts.total_records > 0 {
        log::info!("  Pass rate: {}", format_percent(counts.efficiency(), 2));
    }

    log::info!(
        "Filtered out {} records {}.",
        format_count(counts.unmapped),
        SkipReason::Unmapped.description()
    );
    for reason in [
        SkipReason::HardClipped,
        SkipReason::SoftClipped,
        SkipReason::NoBases,
        SkipReason::AlternateContig,
        SkipReason::NearReferenceStart,
        SkipReason::NearReferenceEnd,
    ] {
        let n = counts.skipped_for(reason);
        if n > 0 {
            log::info!("Filtered out {} records {}.", format_count(n), reason.description());
        }
    }
}

/// Operation timing and summary helper.
///
/// Tracks operation timing and provides formatted summary output.
///
/// # Examples
///
/// ```no_run
/// use bcqc_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Building confusion matrix");
///
/// // ... walk records ...
///
/// timer.log_completion(10_000); // Log with item count
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
