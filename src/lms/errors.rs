//! Error types for the LMS timetable client.

use std::time::Duration;

/// A single fetch attempt against the upstream failed.
///
/// Every variant is treated as transient by the retrying fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Why a table row was skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row has {0} cells, expected at least 3")]
    TooFewCells(usize),
    #[error("time/lecturer cell has {0} large entries, expected at least 2")]
    MissingTimeOrLecturer(usize),
    #[error("unparsable time range {0:?}")]
    MalformedTimeRange(String),
}
