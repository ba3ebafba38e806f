//! End-to-end lecture aggregation against a fixture upstream.

mod helpers;

use helpers::{FixtureSource, TTL, harness, malformed_row, page, row};
use std::time::Duration;
use timetable::lectures::{CacheStatus, DayLimits, LectureParams, LectureQuery};

fn query(date: &str, limit: Option<&str>, batch: Option<&str>, branch: Option<&str>) -> LectureQuery {
    LectureQuery::from_params(
        &LectureParams {
            date: Some(date.to_owned()),
            limit: limit.map(str::to_owned),
            batch: batch.map(str::to_owned),
            branch: branch.map(str::to_owned),
        },
        DayLimits::default(),
    )
    .expect("valid query")
}

fn soc_page() -> String {
    page(&[
        row(&["21.1F", "21.2F"], "auditorium", "3rd Floor", "08:30 AM - 10:30 AM", "Mr. Perera", "Data Structures"),
        malformed_row("21.1F"),
        row(&["22.1P"], "lab", "Ground Floor", "1.00 pm - 3.00 pm", "exam", "Networking Final"),
    ])
}

#[tokio::test]
async fn single_branch_single_day() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);

    let response = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, Some("SOC")))
        .await;

    assert_eq!(response.cache_status, CacheStatus::Miss);
    assert_eq!(response.count, 2);
    assert_eq!(response.failed_targets, 0);
    assert_eq!(h.source.calls(), 1);

    let titles: Vec<&str> = response.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Data Structures", "Networking Final"]);
    assert!(response.records.iter().all(|r| r.properties.branch == "SOC"));
    assert!(response.records.iter().all(|r| r.day_offset == 0));

    let exam = &response.records[1];
    assert!(exam.properties.is_exam);
    assert_eq!(exam.lecturer, "None");
    assert_eq!(exam.time.start, "1.00");
    assert_eq!(exam.time.end, "3.00");
}

#[tokio::test]
async fn second_identical_query_hits_cache() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);
    let q = query("2024-03-01", Some("1"), None, Some("SOC"));

    let first = h.aggregator.handle(&q).await;
    let second = h.aggregator.handle(&q).await;

    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert_eq!(second.records, first.records);
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn batch_filter_shares_cached_fetch() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);

    let unfiltered = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, Some("SOC")))
        .await;
    let filtered = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), Some("21.2"), Some("SOC")))
        .await;

    assert_eq!(unfiltered.count, 2);
    assert_eq!(filtered.cache_status, CacheStatus::Hit);
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.records[0].title, "Data Structures");
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn unknown_branch_fetches_nothing() {
    let source = FixtureSource::new();
    let h = harness(source);

    let response = h
        .aggregator
        .handle(&query("2024-03-01", Some("2"), None, Some("XYZ")))
        .await;

    assert!(response.records.is_empty());
    assert_eq!(response.cache_status, CacheStatus::Miss);
    assert_eq!(response.failed_targets, 0);
    assert_eq!(h.source.calls(), 0);
    assert!(h.aggregator.cache().is_empty());
}

#[tokio::test]
async fn sentinel_branch_name_does_not_poison_unfiltered_query() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);

    let sentinel = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, Some("all")))
        .await;
    assert_eq!(sentinel.count, 0);

    let unfiltered = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, None))
        .await;
    assert_eq!(unfiltered.cache_status, CacheStatus::Miss);
    assert_eq!(unfiltered.count, 2);
    assert_eq!(h.source.calls(), 5);

    // And the cached unfiltered set is not served back to the sentinel name.
    let again = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, Some("all")))
        .await;
    assert_eq!(again.count, 0);
    assert_eq!(again.cache_status, CacheStatus::Miss);
}

#[tokio::test]
async fn total_outage_is_not_cached() {
    let source = FixtureSource::new();
    source.fail("wing=CO");
    let h = harness(source);
    let q = query("2024-03-01", Some("1"), None, Some("SOC"));

    let first = h.aggregator.handle(&q).await;
    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(first.failed_targets, 1);
    assert!(!h.aggregator.cache().contains_key(&q.cache_key()));

    let second = h.aggregator.handle(&q).await;
    assert_eq!(second.cache_status, CacheStatus::Miss);
    assert_eq!(second.failed_targets, 1);
    assert_eq!(h.source.calls(), 6);
}

#[tokio::test]
async fn records_ordered_day_major() {
    let source = FixtureSource::new();
    source.serve(
        "wing=RJ&date=2024-03-01",
        page(&[row(&["B1"], "hall a", "1st Floor", "9.00 - 10.00", "Ms. Silva", "Marketing")]),
    );
    source.serve(
        "wing=CO&date=2024-03-02",
        page(&[row(&["B2"], "hall b", "2nd Floor", "9.00 - 10.00", "Mr. Fernando", "Compilers")]),
    );
    let h = harness(source);

    let response = h
        .aggregator
        .handle(&query("2024-03-01", Some("2"), None, None))
        .await;

    assert_eq!(h.source.calls(), 10);
    let summary: Vec<(&str, u32, &str)> = response
        .records
        .iter()
        .map(|r| (r.title.as_str(), r.day_offset, r.properties.branch.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("Marketing", 0, "SOB"), ("Compilers", 1, "SOC")]
    );
}

#[tokio::test]
async fn entry_goes_stale_after_ttl() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);
    let q = query("2024-03-01", Some("1"), None, Some("SOC"));

    h.aggregator.handle(&q).await;
    h.clock.advance(TTL - Duration::from_secs(1));
    assert_eq!(h.aggregator.handle(&q).await.cache_status, CacheStatus::Hit);

    h.clock.advance(Duration::from_secs(1));
    assert_eq!(h.aggregator.handle(&q).await.cache_status, CacheStatus::Miss);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn sweep_removes_abandoned_entries() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    let h = harness(source);
    let q = query("2024-03-01", Some("1"), None, Some("SOC"));

    h.aggregator.handle(&q).await;
    let cache = h.aggregator.cache();

    h.clock.advance(TTL * 2);
    assert_eq!(cache.sweep(), 0);
    assert!(cache.contains_key(&q.cache_key()));

    h.clock.advance(Duration::from_secs(1));
    assert_eq!(cache.sweep(), 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn failing_branch_degrades_to_empty() {
    let source = FixtureSource::new();
    source.serve("wing=CO&date=2024-03-01", soc_page());
    source.fail("wing=NIC");
    let h = harness(source);

    let response = h
        .aggregator
        .handle(&query("2024-03-01", Some("1"), None, None))
        .await;

    assert_eq!(response.count, 2);
    assert_eq!(response.failed_targets, 1);
    // Four healthy branches once each, NIC three times.
    assert_eq!(h.source.calls(), 7);
    // Two backoffs for NIC, then one pause between the two slices.
    assert_eq!(
        *h.pause.delays.lock().unwrap(),
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(100)
        ]
    );
}
