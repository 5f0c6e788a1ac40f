//! Rate-limited logging of repeated loop errors.

use std::time::{Duration, Instant};
use tracing::warn;

const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Logs the first error of a run, then at most one summary line per minute
/// until the next success.
pub struct ErrorThrottle {
    what: &'static str,
    consecutive_errors: u32,
    last_error_log: Instant,
}

impl ErrorThrottle {
    pub fn new(what: &'static str) -> Self {
        Self {
            what,
            consecutive_errors: 0,
            last_error_log: Instant::now(),
        }
    }

    /// Records an error, logging it if due. Returns true if it was logged.
    pub fn error(&mut self, e: &dyn std::fmt::Display) -> bool {
        self.consecutive_errors += 1;
        let elapsed = self.last_error_log.elapsed();
        if self.consecutive_errors == 1 || elapsed >= LOG_INTERVAL {
            if self.consecutive_errors > 1 {
                warn!(
                    "{} error (repeated {} times in {:?}): {}",
                    self.what, self.consecutive_errors, elapsed, e
                );
            } else {
                warn!("{} error: {}", self.what, e);
            }
            self.last_error_log = Instant::now();
            return true;
        }
        false
    }

    /// Resets the repeat count after a success.
    pub fn ok(&mut self) {
        self.consecutive_errors = 0;
    }
}
