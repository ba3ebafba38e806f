//! Bounded, paced execution of a request plan.
//!
//! The plan is cut into contiguous slices of `concurrency_limit` targets. All
//! targets of a slice are fetched concurrently and joined before the next
//! slice starts, with a fixed pacing delay in between. Results are appended
//! slice by slice in plan order, so output order never depends on which
//! request finished first.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::lms::LectureRecord;
use crate::scraper::Pause;
use crate::scraper::plan::FetchTarget;
use crate::scraper::retry::RetryingFetcher;
use crate::utils::fmt_duration;

/// Flattened result of running a whole plan.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOutcome {
    pub records: Vec<LectureRecord>,
    /// Targets that produced nothing because every attempt failed.
    pub failed_targets: usize,
    pub slices: usize,
}

pub struct SliceScheduler {
    fetcher: Arc<RetryingFetcher>,
    concurrency_limit: usize,
    inter_slice_delay: Duration,
    pause: Arc<dyn Pause>,
}

impl SliceScheduler {
    /// A zero `concurrency_limit` is raised to one.
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        concurrency_limit: usize,
        inter_slice_delay: Duration,
        pause: Arc<dyn Pause>,
    ) -> Self {
        Self {
            fetcher,
            concurrency_limit: concurrency_limit.max(1),
            inter_slice_delay,
            pause,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Run every target of `plan`, at most `concurrency_limit` at a time.
    pub async fn run(&self, plan: &[FetchTarget]) -> ScheduleOutcome {
        let start = Instant::now();
        let mut outcome = ScheduleOutcome::default();
        let slice_count = plan.len().div_ceil(self.concurrency_limit);

        for (index, slice) in plan.chunks(self.concurrency_limit).enumerate() {
            trace!(slice = index, targets = slice.len(), "Starting slice");

            let reports = join_all(
                slice
                    .iter()
                    .map(|target| self.fetcher.fetch_with_retry(target)),
            )
            .await;

            for report in reports {
                if report.exhausted {
                    outcome.failed_targets += 1;
                }
                outcome.records.extend(report.records);
            }
            outcome.slices += 1;

            if index + 1 < slice_count {
                self.pause.pause(self.inter_slice_delay).await;
            }
        }

        debug!(
            targets = plan.len(),
            slices = outcome.slices,
            records = outcome.records.len(),
            failed_targets = outcome.failed_targets,
            duration = fmt_duration(start.elapsed()),
            "Request plan complete"
        );
        outcome
    }
}
