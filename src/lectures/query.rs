//! Lecture queries: validation of inbound parameters and cache keying.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::lms::{Branch, LectureRecord};
use crate::scraper::plan::parse_date;

/// Sentinel used in cache keys for an absent filter.
const ALL: &str = "all";

/// The only failure a lecture query surfaces to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    #[error("Date is required")]
    MissingDate,
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid limit {0:?}, expected a positive integer")]
    InvalidLimit(String),
    #[error("Limit {requested} exceeds the maximum of {max} days")]
    LimitTooLarge { requested: u32, max: u32 },
}

/// The branches a query covers, resolved from its branch filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope<'a> {
    All,
    One(Branch),
    /// A filter naming no known branch. Plans nothing and is never cached.
    Unknown(&'a str),
}

/// Raw query-string parameters, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LectureParams {
    pub date: Option<String>,
    pub limit: Option<String>,
    pub batch: Option<String>,
    pub branch: Option<String>,
}

/// Bounds on the number of days a single query may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayLimits {
    pub default_day_count: u32,
    pub max_day_count: u32,
}

impl Default for DayLimits {
    fn default() -> Self {
        Self {
            default_day_count: 3,
            max_day_count: 14,
        }
    }
}

/// A validated lecture query. Immutable for the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureQuery {
    pub start_date: NaiveDate,
    pub day_count: u32,
    /// Substring matched against each record's batches.
    pub batch_filter: Option<String>,
    /// Branch display name; an unknown name plans nothing.
    pub branch_filter: Option<String>,
}

impl LectureQuery {
    pub fn from_params(params: &LectureParams, limits: DayLimits) -> Result<Self, InvalidRequest> {
        let date = non_empty(params.date.as_deref()).ok_or(InvalidRequest::MissingDate)?;
        let start_date = parse_date(date)?;

        let day_count = match non_empty(params.limit.as_deref()) {
            None => limits.default_day_count,
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) | Err(_) => return Err(InvalidRequest::InvalidLimit(raw.to_owned())),
                Ok(n) => n,
            },
        };
        if day_count > limits.max_day_count {
            return Err(InvalidRequest::LimitTooLarge {
                requested: day_count,
                max: limits.max_day_count,
            });
        }

        Ok(Self {
            start_date,
            day_count,
            batch_filter: non_empty(params.batch.as_deref()).map(str::to_owned),
            branch_filter: non_empty(params.branch.as_deref()).map(str::to_owned),
        })
    }

    pub fn branch_scope(&self) -> BranchScope<'_> {
        match self.branch_filter.as_deref() {
            None => BranchScope::All,
            Some(name) => match Branch::from_display_name(name) {
                Some(branch) => BranchScope::One(branch),
                None => BranchScope::Unknown(name),
            },
        }
    }

    /// Cache key for this query's upstream data.
    ///
    /// The batch filter is not part of the key: the cached value is the
    /// unfiltered, branch-scoped record set, and batch filtering happens after
    /// the cache, so every batch shares one upstream fetch. The branch part is
    /// the resolved branch, so a filter that merely spells the `all` sentinel
    /// never shares a key with an unfiltered query.
    pub fn cache_key(&self) -> String {
        let branch = match self.branch_scope() {
            BranchScope::All => ALL.to_owned(),
            BranchScope::One(branch) => branch.display_name().to_owned(),
            BranchScope::Unknown(name) => format!("unknown:{name}"),
        };
        format!(
            "{}-{}-{branch}",
            self.start_date.format("%Y-%m-%d"),
            self.day_count,
        )
    }

    /// Keep only records serving the requested batch, if any.
    pub fn apply_batch_filter(&self, records: &[LectureRecord]) -> Vec<LectureRecord> {
        match self.batch_filter.as_deref() {
            None => records.to_vec(),
            Some(batch) => records
                .iter()
                .filter(|record| record.serves_batch(batch))
                .cloned()
                .collect(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
