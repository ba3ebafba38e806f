//! Timetable row extraction.
//!
//! Each timetable page is a set of `div.swiper-slide` tables whose rows carry
//! three logical cells:
//!
//! 1. batch list, one `div > big > b` entry per batch (`"21.1F/CO"`)
//! 2. location, hall name in `<big>` entries followed by floor text
//! 3. time range and lecturer as the first two `<big>` entries, then the title
//!    as the cell's trailing text
//!
//! The markup is hand-edited upstream and inconsistent, so extraction is done
//! row by row: a row that does not fit is skipped and never fails the page.
//! The logic only depends on the [`RowCells`] view of a row, so it can be
//! exercised against synthetic rows without any HTML.

use html_scraper::{ElementRef, Html, Node, Selector};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::lms::branch::Branch;
use crate::lms::errors::RowError;
use crate::lms::models::{LectureRecord, Location, Properties, TimeRange};

/// Stripped from every batch entry.
const BATCH_SUFFIX: &str = "/CO";

/// Branch-code tokens and stray separators that leak into the floor text.
const FLOOR_BLACKLIST: [&str; 5] = ["CO", "NIC", "SOC", "SOB", "/"];

const BATCH_CELL: usize = 0;
const LOCATION_CELL: usize = 1;
const SESSION_CELL: usize = 2;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.swiper-slide > table > tbody > tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static BATCH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div > big > b").unwrap());
static LARGE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("big").unwrap());

static MERIDIEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*[ap]m\s*$").unwrap());

/// Read-only view of one table row, as the extractor needs it.
///
/// Out-of-range cell indices yield empty values.
pub trait RowCells {
    fn cell_count(&self) -> usize;
    /// Full text content of a cell.
    fn cell_text(&self, index: usize) -> String;
    /// Trimmed text of each "large" (`<big>`) sub-entry of a cell.
    fn large_entries(&self, index: usize) -> Vec<String>;
    /// Trimmed text of each bold batch sub-entry of a cell.
    fn bold_entries(&self, index: usize) -> Vec<String>;
    /// Text of the last child node of a cell.
    fn trailing_text(&self, index: usize) -> String;
}

/// A `<tr>` from a parsed timetable page.
struct HtmlRow<'a> {
    cells: Vec<ElementRef<'a>>,
}

impl<'a> HtmlRow<'a> {
    fn new(row: ElementRef<'a>) -> Self {
        Self {
            cells: row.select(&CELL_SEL).collect(),
        }
    }

    fn entries(&self, index: usize, selector: &Selector) -> Vec<String> {
        self.cells
            .get(index)
            .map(|cell| {
                cell.select(selector)
                    .map(|el| el.text().collect::<String>().trim().to_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RowCells for HtmlRow<'_> {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_text(&self, index: usize) -> String {
        self.cells
            .get(index)
            .map(|cell| cell.text().collect())
            .unwrap_or_default()
    }

    fn large_entries(&self, index: usize) -> Vec<String> {
        self.entries(index, &LARGE_SEL)
    }

    fn bold_entries(&self, index: usize) -> Vec<String> {
        self.entries(index, &BATCH_SEL)
    }

    fn trailing_text(&self, index: usize) -> String {
        let Some(node) = self.cells.get(index).and_then(|cell| cell.children().last()) else {
            return String::new();
        };
        match node.value() {
            Node::Text(text) => {
                let text: &str = &text.text;
                text.to_owned()
            }
            _ => ElementRef::wrap(node)
                .map(|el| el.text().collect())
                .unwrap_or_default(),
        }
    }
}

/// Parse a fetched timetable page into lecture records.
///
/// Never fails: a page without timetable rows yields no records, and rows
/// that do not fit the expected shape are skipped.
pub fn extract_document(document: &str, branch: Branch, day_offset: u32) -> Vec<LectureRecord> {
    let html = Html::parse_document(document);
    let rows: Vec<HtmlRow<'_>> = html.select(&ROW_SEL).map(HtmlRow::new).collect();
    let row_count = rows.len();
    let records = extract_rows(rows, branch, day_offset);

    debug!(
        branch = %branch,
        day_offset,
        rows = row_count,
        records = records.len(),
        "Extracted timetable page"
    );
    records
}

/// Extract every row that parses, skipping the rest.
pub fn extract_rows<R, I>(rows: I, branch: Branch, day_offset: u32) -> Vec<LectureRecord>
where
    R: RowCells,
    I: IntoIterator<Item = R>,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match extract_row(&row, branch, day_offset) {
            Ok(record) => Some(record),
            Err(e) => {
                trace!(branch = %branch, day_offset, row = index, reason = %e, "Skipping row");
                None
            }
        })
        .collect()
}

/// Extract a single lecture record from a row.
pub fn extract_row<R: RowCells + ?Sized>(
    row: &R,
    branch: Branch,
    day_offset: u32,
) -> Result<LectureRecord, RowError> {
    let cells = row.cell_count();
    if cells < 3 {
        return Err(RowError::TooFewCells(cells));
    }

    let batch = row
        .bold_entries(BATCH_CELL)
        .iter()
        .map(|entry| strip_batch_suffix(entry))
        .filter(|entry| !entry.is_empty())
        .collect();

    let hall = row
        .large_entries(LOCATION_CELL)
        .iter()
        .map(|entry| entry.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let floor = clean_floor(&row.cell_text(LOCATION_CELL), &hall);

    let large = row.large_entries(SESSION_CELL);
    let [time, lecturer, ..] = large.as_slice() else {
        return Err(RowError::MissingTimeOrLecturer(large.len()));
    };
    let time = parse_time_range(time)?;

    let lecturer = lecturer.trim();
    let is_exam = lecturer.eq_ignore_ascii_case("exam");
    let lecturer = if is_exam { "None" } else { lecturer };

    Ok(LectureRecord {
        title: row.trailing_text(SESSION_CELL).trim().to_owned(),
        batch,
        lecturer: lecturer.to_owned(),
        day_offset,
        location: Location {
            hall: capitalize_first(&hall),
            floor,
        },
        time,
        properties: Properties {
            is_exam,
            branch: branch.display_name().to_owned(),
        },
    })
}

fn strip_batch_suffix(entry: &str) -> String {
    entry.trim().replace(BATCH_SUFFIX, "").trim().to_owned()
}

/// Floor text is whatever remains of the location cell once the hall, branch
/// codes and separators are removed. Repeated words keep their first position.
fn clean_floor(cell_text: &str, hall: &str) -> String {
    let remainder = cell_text.replacen(hall, "", 1);
    let mut seen = HashSet::new();
    remainder
        .split_whitespace()
        .filter(|word| !FLOOR_BLACKLIST.contains(word))
        .filter(|word| seen.insert(*word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_time_range(raw: &str) -> Result<TimeRange, RowError> {
    let mut parts = raw.split('-');
    let start = parts.next().map(strip_meridiem).unwrap_or_default();
    let end = parts.next().map(strip_meridiem).unwrap_or_default();

    if start.is_empty() || end.is_empty() {
        return Err(RowError::MalformedTimeRange(raw.to_owned()));
    }
    Ok(TimeRange { start, end })
}

fn strip_meridiem(time: &str) -> String {
    MERIDIEM_RE.replace(time.trim(), "").trim().to_owned()
}
