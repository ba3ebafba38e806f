//! Client-side model of the LMS timetable feed.
//!
//! Each campus branch publishes one HTML timetable page per day. This module
//! knows how to address those pages, fetch them, and turn their table rows
//! into [`LectureRecord`]s.

pub mod branch;
pub mod errors;
pub mod extract;
pub mod models;
pub mod source;

pub use branch::Branch;
pub use errors::{FetchError, RowError};
pub use extract::{RowCells, extract_document, extract_row, extract_rows};
pub use models::{LectureRecord, Location, Properties, TimeRange};
pub use source::{DocumentSource, HttpSource};
