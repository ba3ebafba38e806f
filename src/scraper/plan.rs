//! Date planning and request-plan construction.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use url::Url;

use crate::lectures::query::{BranchScope, InvalidRequest, LectureQuery};
use crate::lms::Branch;

/// One unit of fetch work: a branch's timetable page for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub address: String,
    pub branch: Branch,
    /// Days past the query's start date, carried into every record.
    pub day_offset: u32,
    pub date: NaiveDate,
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, InvalidRequest> {
    let raw = raw.trim();
    let well_shaped = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_shaped {
        return Err(InvalidRequest::InvalidDate(raw.to_owned()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| InvalidRequest::InvalidDate(raw.to_owned()))
}

/// `start` plus `offset` calendar days. `None` past the end of the calendar.
///
/// `NaiveDate` carries no timezone, so there is no drift around midnight or
/// DST changes.
pub fn offset_date(start: NaiveDate, offset: u32) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(u64::from(offset)))
}

/// The `day_count` consecutive dates beginning at `start`.
pub fn plan_dates(start: NaiveDate, day_count: u32) -> Vec<NaiveDate> {
    (0..day_count)
        .map_while(|offset| offset_date(start, offset))
        .collect()
}

/// English weekday name of `start + offset`, e.g. `"Friday"`.
pub fn weekday_label(start: NaiveDate, offset: u32) -> Option<&'static str> {
    let name = match offset_date(start, offset)?.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    };
    Some(name)
}

/// Expand a query into fetch targets, day-major and branch-minor.
///
/// An unknown branch filter yields an empty plan rather than an error.
pub fn build_plan(query: &LectureQuery, upstream: &Url) -> Vec<FetchTarget> {
    let branches: Vec<Branch> = match query.branch_scope() {
        BranchScope::All => Branch::ALL.to_vec(),
        BranchScope::One(branch) => vec![branch],
        BranchScope::Unknown(_) => Vec::new(),
    };

    plan_dates(query.start_date, query.day_count)
        .into_iter()
        .zip(0u32..)
        .flat_map(|(date, day_offset)| {
            branches.iter().map(move |&branch| FetchTarget {
                address: target_address(upstream, branch, date),
                branch,
                day_offset,
                date,
            })
        })
        .collect()
}

fn target_address(upstream: &Url, branch: Branch, date: NaiveDate) -> String {
    let mut url = upstream.clone();
    url.query_pairs_mut()
        .append_pair("wing", branch.upstream_keyword())
        .append_pair("date", &date.format("%Y-%m-%d").to_string());
    url.into()
}
