//! Normalized lecture records produced from timetable rows.

use serde::Serialize;

/// One scheduled session on one branch's timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LectureRecord {
    pub title: String,
    /// A session may serve several batches at once.
    pub batch: Vec<String>,
    /// `"None"` for exam sessions.
    pub lecturer: String,
    /// Days past the query's start date.
    pub day_offset: u32,
    pub location: Location,
    pub time: TimeRange,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub hall: String,
    pub floor: String,
}

/// Start and end text with am/pm markers stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Properties {
    pub is_exam: bool,
    /// Display name of the branch the record was fetched from.
    pub branch: String,
}

impl LectureRecord {
    /// Substring match against any of the record's batches.
    pub fn serves_batch(&self, needle: &str) -> bool {
        self.batch.iter().any(|batch| batch.contains(needle))
    }
}
