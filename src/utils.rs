use std::time::{Duration, Instant};
use tracing::warn;

/// Compact human form of a duration with automatic unit scaling, e.g. `1.94ms`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Warn when more than `threshold` has passed since `start`. Returns the elapsed time.
pub fn log_if_slow(start: Instant, threshold: Duration, operation: &str) -> Duration {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        warn!(
            operation,
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "Slow operation"
        );
    }
    elapsed
}
