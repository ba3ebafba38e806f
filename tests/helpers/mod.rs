#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use timetable::config::PipelineConfig;
use timetable::lectures::{Aggregator, Clock, DayLimits};
use timetable::lms::{DocumentSource, FetchError};
use timetable::scraper::{Pause, RetryPolicy};
use url::Url;

pub const UPSTREAM: &str = "https://lms.example.edu/mod/nibm/display.php";
pub const TTL: Duration = Duration::from_secs(300);

/// Serves canned documents by address substring. Unmatched addresses get an
/// empty page; matches on a failing pattern return a 503.
#[derive(Default)]
pub struct FixtureSource {
    pages: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, pattern: &str, document: String) {
        self.pages
            .lock()
            .unwrap()
            .push((pattern.to_owned(), document));
    }

    pub fn fail(&self, pattern: &str) {
        self.failing.lock().unwrap().push(pattern.to_owned());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for FixtureSource {
    async fn fetch(&self, address: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|pattern| address.contains(pattern.as_str()))
        {
            return Err(FetchError::Status {
                status: 503,
                url: address.to_owned(),
            });
        }
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .iter()
            .find(|(pattern, _)| address.contains(pattern.as_str()))
            .map(|(_, document)| document.clone())
            .unwrap_or_else(|| "<html><body></body></html>".to_owned()))
    }
}

/// Records requested delays without sleeping.
#[derive(Default)]
pub struct RecordingPause {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

/// One timetable row: batches, hall cell, time and lecturer, title.
pub fn row(batches: &[&str], hall: &str, floor: &str, time: &str, lecturer: &str, title: &str) -> String {
    let batch_cells: String = batches
        .iter()
        .map(|b| format!("<div><big><b>{b}/CO</b></big></div>"))
        .collect();
    format!(
        "<tr><td>{batch_cells}</td><td><big>{hall}</big> {floor}</td>\
         <td><big>{time}</big><br><big>{lecturer}</big><br>{title}</td></tr>"
    )
}

/// A row missing its time and lecturer cell.
pub fn malformed_row(batch: &str) -> String {
    format!("<tr><td><div><big><b>{batch}/CO</b></big></div></td><td><big>lab</big> 2nd Floor</td></tr>")
}

pub fn page(rows: &[String]) -> String {
    format!(
        "<html><body><div class=\"swiper-slide\"><table><tbody>{}</tbody></table></div></body></html>",
        rows.concat()
    )
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        upstream_url: Url::parse(UPSTREAM).unwrap(),
        request_timeout: Duration::from_secs(5),
        concurrency_limit: 3,
        slice_delay: Duration::from_millis(100),
        retry: RetryPolicy::new(3, Duration::from_millis(10)),
        cache_ttl: TTL,
        limits: DayLimits::default(),
    }
}

pub struct Harness {
    pub aggregator: Arc<Aggregator>,
    pub source: Arc<FixtureSource>,
    pub pause: Arc<RecordingPause>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(source: Arc<FixtureSource>) -> Harness {
    let pause = Arc::new(RecordingPause::default());
    let clock = ManualClock::new();
    let aggregator = Aggregator::new(
        &pipeline_config(),
        source.clone(),
        pause.clone(),
        clock.clone(),
    );
    Harness {
        aggregator: Arc::new(aggregator),
        source,
        pause,
        clock,
    }
}
