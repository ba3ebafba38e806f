//! Fetch planning and execution against the LMS timetable feed.
//!
//! A query expands into a [`plan`] of per-day, per-branch targets, which the
//! [`slices`] scheduler runs in bounded concurrent slices, each target going
//! through the [`retry`] fetcher.

pub mod plan;
pub mod retry;
pub mod slices;

use async_trait::async_trait;
use std::time::Duration;

pub use plan::{FetchTarget, build_plan, offset_date, parse_date, plan_dates, weekday_label};
pub use retry::{FetchReport, RetryPolicy, RetryingFetcher};
pub use slices::{ScheduleOutcome, SliceScheduler};

/// Waits out backoff and pacing delays.
///
/// Injected so that timing can be observed without sleeping in tests.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// [`Pause`] on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
