//! Per-target fetch with bounded retries and exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::lms::{DocumentSource, FetchError, LectureRecord, extract_document};
use crate::scraper::Pause;
use crate::scraper::plan::FetchTarget;
use crate::utils::fmt_duration;

/// How many times a target is attempted and how long to back off in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// A zero `max_attempts` is raised to one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt at `attempt_index` (0-based): `2^i * base`.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// What happened to one target.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Empty when every attempt failed.
    pub records: Vec<LectureRecord>,
    pub attempts: u32,
    pub exhausted: bool,
}

enum RetryState {
    Attempting(u32),
    Succeeded(Vec<LectureRecord>),
    ExhaustedRetries(FetchError),
}

/// Fetches and extracts one target, absorbing upstream failures.
pub struct RetryingFetcher {
    source: Arc<dyn DocumentSource>,
    policy: RetryPolicy,
    request_timeout: Duration,
    pause: Arc<dyn Pause>,
}

impl RetryingFetcher {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        policy: RetryPolicy,
        request_timeout: Duration,
        pause: Arc<dyn Pause>,
    ) -> Self {
        Self {
            source,
            policy,
            request_timeout,
            pause,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch a target, retrying with backoff.
    ///
    /// Never fails: once every attempt is used up the report carries no records
    /// and `exhausted` is set, so a single unreachable page cannot fail a query.
    pub async fn fetch_with_retry(&self, target: &FetchTarget) -> FetchReport {
        let start = Instant::now();
        let mut attempts = 0;
        let mut state = RetryState::Attempting(0);

        loop {
            state = match state {
                RetryState::Attempting(index) => {
                    attempts = index + 1;
                    match self.fetch_once(target).await {
                        Ok(records) => RetryState::Succeeded(records),
                        Err(e) if attempts >= self.policy.max_attempts => {
                            RetryState::ExhaustedRetries(e)
                        }
                        Err(e) => {
                            let delay = self.policy.backoff_delay(index);
                            warn!(
                                url = target.address.as_str(),
                                branch = %target.branch,
                                attempt = attempts,
                                max_attempts = self.policy.max_attempts,
                                backoff = fmt_duration(delay),
                                error = %e,
                                "Timetable fetch failed, will retry"
                            );
                            self.pause.pause(delay).await;
                            RetryState::Attempting(index + 1)
                        }
                    }
                }
                RetryState::Succeeded(records) => {
                    debug!(
                        url = target.address.as_str(),
                        attempts,
                        records = records.len(),
                        duration = fmt_duration(start.elapsed()),
                        "Timetable fetched"
                    );
                    return FetchReport {
                        records,
                        attempts,
                        exhausted: false,
                    };
                }
                RetryState::ExhaustedRetries(e) => {
                    error!(
                        url = target.address.as_str(),
                        branch = %target.branch,
                        day_offset = target.day_offset,
                        attempts,
                        duration = fmt_duration(start.elapsed()),
                        error = %e,
                        "Timetable fetch failed permanently, returning no records"
                    );
                    return FetchReport {
                        records: Vec::new(),
                        attempts,
                        exhausted: true,
                    };
                }
            };
        }
    }

    /// One attempt: fetch under the per-attempt timeout, then extract.
    async fn fetch_once(&self, target: &FetchTarget) -> Result<Vec<LectureRecord>, FetchError> {
        let document = tokio::time::timeout(self.request_timeout, self.source.fetch(&target.address))
            .await
            .map_err(|_| FetchError::Timeout(self.request_timeout))??;

        Ok(extract_document(&document, target.branch, target.day_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lms::Branch;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    const ROW_PAGE: &str = r#"<div class="swiper-slide"><table><tbody><tr>
<td><div><big><b>21.1F/CO</b></big></div></td>
<td><big>auditorium</big> 3rd Floor</td>
<td><big>08:30 AM - 10:30 AM</big><big>Mr. Perera</big>Data Structures</td>
</tr></tbody></table></div>"#;

    /// Fails the first `failures` calls, then serves `ROW_PAGE`.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl DocumentSource for FlakySource {
        async fn fetch(&self, address: &str) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchError::Status {
                    status: 503,
                    url: address.to_owned(),
                })
            } else {
                Ok(ROW_PAGE.to_owned())
            }
        }
    }

    /// Never answers within any sane timeout.
    struct HangingSource;

    #[async_trait]
    impl DocumentSource for HangingSource {
        async fn fetch(&self, _address: &str) -> Result<String, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pause for RecordingPause {
        async fn pause(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn target() -> FetchTarget {
        FetchTarget {
            address: "https://lms.example.edu/display.php?wing=CO&date=2024-03-01".into(),
            branch: Branch::Soc,
            day_offset: 0,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn fetcher(source: Arc<dyn DocumentSource>, pause: Arc<RecordingPause>) -> RetryingFetcher {
        RetryingFetcher::new(
            source,
            RetryPolicy::new(3, Duration::from_millis(10)),
            Duration::from_secs(5),
            pause,
        )
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(
            policy.backoff_delay(64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let source = Arc::new(FlakySource {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let pause = Arc::new(RecordingPause::default());
        let report = fetcher(source.clone(), pause.clone())
            .fetch_with_retry(&target())
            .await;

        assert!(!report.exhausted);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.records.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *pause.delays.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[tokio::test]
    async fn test_always_failing_returns_empty() {
        let source = Arc::new(FlakySource {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let pause = Arc::new(RecordingPause::default());
        let report = fetcher(source.clone(), pause.clone())
            .fetch_with_retry(&target())
            .await;

        assert!(report.exhausted);
        assert!(report.records.is_empty());
        assert_eq!(report.attempts, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        // No backoff after the final attempt.
        assert_eq!(pause.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_no_delay() {
        let source = Arc::new(FlakySource {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let pause = Arc::new(RecordingPause::default());
        let report = fetcher(source, pause.clone()).fetch_with_retry(&target()).await;

        assert_eq!(report.attempts, 1);
        assert!(pause.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let pause = Arc::new(RecordingPause::default());
        let fetcher = RetryingFetcher::new(
            Arc::new(HangingSource),
            RetryPolicy::new(2, Duration::from_millis(1)),
            Duration::from_millis(20),
            pause.clone(),
        );
        let report = fetcher.fetch_with_retry(&target()).await;

        assert!(report.exhausted);
        assert_eq!(report.attempts, 2);
        assert_eq!(*pause.delays.lock().unwrap(), vec![Duration::from_millis(1)]);
    }
}
