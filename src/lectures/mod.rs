//! Lecture aggregation: cache lookup, planning, bounded fetching, filtering.

pub mod cache;
pub mod query;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::PipelineConfig;
use crate::lms::{DocumentSource, LectureRecord};
use crate::scraper::plan::{build_plan, offset_date, weekday_label};
use crate::scraper::{Pause, RetryingFetcher, SliceScheduler};
use crate::utils::{fmt_duration, log_if_slow};

pub use cache::{CacheHit, Clock, QueryCache, SystemClock};
pub use query::{BranchScope, DayLimits, InvalidRequest, LectureParams, LectureQuery};

const SLOW_AGGREGATION_THRESHOLD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Records for one query plus metadata describing how they were obtained.
#[derive(Debug, Clone)]
pub struct LectureResponse {
    pub records: Vec<LectureRecord>,
    pub cache_status: CacheStatus,
    pub duration: Duration,
    pub count: usize,
    /// Plan targets that yielded nothing after exhausting retries. Zero on a hit.
    pub failed_targets: usize,
}

/// Owns the query cache and the fetch pipeline behind it.
pub struct Aggregator {
    upstream_url: Url,
    scheduler: SliceScheduler,
    cache: QueryCache,
}

impl Aggregator {
    pub fn new(
        config: &PipelineConfig,
        source: Arc<dyn DocumentSource>,
        pause: Arc<dyn Pause>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fetcher = RetryingFetcher::new(
            source,
            config.retry,
            config.request_timeout,
            pause.clone(),
        );
        let scheduler = SliceScheduler::new(
            Arc::new(fetcher),
            config.concurrency_limit,
            config.slice_delay,
            pause,
        );
        Self {
            upstream_url: config.upstream_url.clone(),
            scheduler,
            cache: QueryCache::with_clock(config.cache_ttl, clock),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Answer a query from the cache, or fetch, cache, and answer it.
    ///
    /// Upstream failures only ever shrink the result; this cannot fail.
    pub async fn handle(&self, query: &LectureQuery) -> LectureResponse {
        let start = Instant::now();

        if let BranchScope::Unknown(branch) = query.branch_scope() {
            debug!(branch, "Unknown branch filter, nothing to fetch");
            return LectureResponse {
                records: Vec::new(),
                cache_status: CacheStatus::Miss,
                duration: start.elapsed(),
                count: 0,
                failed_targets: 0,
            };
        }

        let key = query.cache_key();

        if let Some(hit) = self.cache.get(&key) {
            let records = query.apply_batch_filter(&hit.records);
            let duration = start.elapsed();
            info!(
                key = key.as_str(),
                age = fmt_duration(hit.age),
                count = records.len(),
                duration = fmt_duration(duration),
                "Lecture cache hit"
            );
            return LectureResponse {
                count: records.len(),
                records,
                cache_status: CacheStatus::Hit,
                duration,
                failed_targets: 0,
            };
        }

        let plan = build_plan(query, &self.upstream_url);
        let outcome = self.scheduler.run(&plan).await;
        let fetched = if outcome.failed_targets == plan.len() && !plan.is_empty() {
            // Total outage: leave the key uncached so the next query retries upstream.
            warn!(
                key = key.as_str(),
                failed_targets = outcome.failed_targets,
                "Every timetable fetch failed, not caching"
            );
            Arc::new(outcome.records)
        } else {
            self.cache.put(key.clone(), outcome.records)
        };
        let records = query.apply_batch_filter(&fetched);

        let duration = log_if_slow(start, SLOW_AGGREGATION_THRESHOLD, "lecture aggregation");
        info!(
            key = key.as_str(),
            targets = plan.len(),
            fetched = fetched.len(),
            count = records.len(),
            failed_targets = outcome.failed_targets,
            duration = fmt_duration(duration),
            "Lecture cache miss, fetched upstream"
        );

        LectureResponse {
            count: records.len(),
            records,
            cache_status: CacheStatus::Miss,
            duration,
            failed_targets: outcome.failed_targets,
        }
    }
}

/// Group records under `"<date> (<Weekday>)"` headings, earliest day first.
pub fn group_by_day(
    query: &LectureQuery,
    records: Vec<LectureRecord>,
) -> BTreeMap<String, Vec<LectureRecord>> {
    let mut days: BTreeMap<String, Vec<LectureRecord>> = BTreeMap::new();
    for record in records {
        let heading = match (
            offset_date(query.start_date, record.day_offset),
            weekday_label(query.start_date, record.day_offset),
        ) {
            (Some(date), Some(weekday)) => format!("{} ({weekday})", date.format("%Y-%m-%d")),
            _ => format!("+{} days", record.day_offset),
        };
        days.entry(heading).or_default().push(record);
    }
    days
}
