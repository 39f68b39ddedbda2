//! Progress tracking utilities
//!
//! [`ProgressTracker`] keeps a running count of processed items and logs a line each time
//! the count crosses a multiple of its interval.

use log::info;

/// Logs progress at regular intervals.
///
/// # Example
/// ```
/// use bcqc_lib::progress::ProgressTracker;
///
/// let mut tracker = ProgressTracker::new("Processed records").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.add(1);  // Logs at 100, 200
/// }
/// tracker.log_final();  // Logs "Processed records 250 (complete)"
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: u64,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified message and an interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: 0 }
    }

    /// Set the logging interval. An interval of zero disables interval logging.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Add to the count, logging once for every interval boundary crossed.
    ///
    /// # Returns
    /// `true` if at least one boundary was crossed.
    pub fn add(&mut self, additional: u64) -> bool {
        let prev = self.count;
        self.count += additional;
        if self.interval == 0 {
            return false;
        }

        let prev_intervals = prev / self.interval;
        let new_intervals = self.count / self.interval;
        for i in (prev_intervals + 1)..=new_intervals {
            info!("{} {}", self.message, i * self.interval);
        }
        new_intervals > prev_intervals
    }

    /// Logs the final count with "(complete)" unless it was just logged as a milestone.
    pub fn log_final(&self) {
        let on_interval = self.interval > 0 && self.count.is_multiple_of(self.interval);
        if self.count > 0 && !on_interval {
            info!("{} {} (complete)", self.message, self.count);
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn interval(&self) -> u64 {
        self.interval
    }
}
