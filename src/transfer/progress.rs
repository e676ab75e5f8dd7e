//! Progress tracking for transfer operations
//!
//! Counts documents absorbed by the submitter and renders the throughput
//! line `count | rate req/s | mm:ss`, optionally on a spinner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::trace;

/// Progress tracker for a push run
///
/// Only the submitter records documents; any number of readers may call
/// [`count`](Self::count) or [`line`](Self::line) concurrently.
#[derive(Debug)]
pub struct ProgressTracker {
    /// Number of documents absorbed so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a spinner with the throughput line
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record one more absorbed document
    ///
    /// # Returns
    /// * `u64` - Count after this document
    pub fn record(&self) -> u64 {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        let line = format_line(current, self.start_time.elapsed());

        if let Some(ref bar) = self.bar {
            bar.set_message(line);
        } else {
            trace!("{}", line);
        }
        current
    }

    /// Documents absorbed so far
    pub fn count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Time since the tracker was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Current throughput line
    pub fn line(&self) -> String {
        format_line(self.count(), self.elapsed())
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Render `count | rate req/s | mm:ss`
pub fn format_line(count: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        (count as f64 / secs) as u64
    } else {
        0
    };
    let whole = elapsed.as_secs();
    format!(
        "{:>10} | {:>6} req/s | {:02}:{:02}",
        count,
        rate,
        whole / 60,
        whole % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line(1500, Duration::from_secs(75));
        assert_eq!(line, "      1500 |     20 req/s | 01:15");
    }

    #[test]
    fn test_format_line_at_start() {
        let line = format_line(0, Duration::ZERO);
        assert_eq!(line, "         0 |      0 req/s | 00:00");
    }

    #[test]
    fn test_record_increments_count() {
        let tracker = ProgressTracker::new(false);
        assert_eq!(tracker.record(), 1);
        assert_eq!(tracker.record(), 2);
        assert_eq!(tracker.count(), 2);
        assert!(tracker.line().contains("req/s"));
        tracker.finish();
    }

    #[test]
    fn test_concurrent_reader_sees_progress() {
        let tracker = std::sync::Arc::new(ProgressTracker::new(false));
        let reader = tracker.clone();
        tracker.record();
        assert_eq!(reader.count(), 1);
    }
}
