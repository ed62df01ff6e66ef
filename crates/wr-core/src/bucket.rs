//! Time bucketing.
//!
//! Maps calendar dates to report buckets at the four supported
//! granularities. All arithmetic is timezone-naive and derived purely from
//! the logged-on date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Month abbreviations for bucket labels, index 0 = January.
const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Maximum week-of-month index. Day 29-31 always lands in week 5.
const MAX_WEEK: u8 = 5;

/// The time-bucket resolution of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Yearly,
    Quarterly,
    Monthly,
    Weekly,
}

impl Granularity {
    /// String representation for logs and config.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Yearly => "yearly",
            Self::Quarterly => "quarterly",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A specific time-window cell that aggregated hours are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// Whole year.
    Year(i32),
    /// (year, quarter 1-4).
    Quarter(i32, u8),
    /// (year, month 1-12).
    Month(i32, u8),
    /// (year, month 1-12, week-of-month 1-5).
    Week(i32, u8, u8),
}

/// Week-of-month for a day-of-month: `ceil(day / 7)`, clamped to 5.
///
/// Days 1-7 map to week 1, 8-14 to week 2, and 29-31 stay in week 5.
#[must_use]
pub fn week_of_month(day: u8) -> u8 {
    (day.saturating_sub(1) / 7 + 1).min(MAX_WEEK)
}

/// Quarter (1-4) for a month (1-12).
#[must_use]
pub const fn quarter_of_month(month: u8) -> u8 {
    (month - 1) / 3 + 1
}

impl Bucket {
    /// The bucket a date falls into at the given granularity.
    #[must_use]
    pub fn for_date(date: NaiveDate, granularity: Granularity) -> Self {
        let year = date.year();
        #[allow(clippy::cast_possible_truncation)]
        let month = date.month() as u8;
        #[allow(clippy::cast_possible_truncation)]
        let day = date.day() as u8;
        match granularity {
            Granularity::Yearly => Self::Year(year),
            Granularity::Quarterly => Self::Quarter(year, quarter_of_month(month)),
            Granularity::Monthly => Self::Month(year, month),
            Granularity::Weekly => Self::Week(year, month, week_of_month(day)),
        }
    }

    /// Column label for report headers (e.g., "2025", "Q3", "Sep", "SepW2").
    #[must_use]
    pub fn label(&self) -> String {
        match *self {
            Self::Year(year) => year.to_string(),
            Self::Quarter(_, quarter) => format!("Q{quarter}"),
            Self::Month(_, month) => MONTH_ABBR[usize::from(month - 1)].to_string(),
            Self::Week(_, month, week) => {
                format!("{}W{week}", MONTH_ABBR[usize::from(month - 1)])
            }
        }
    }
}

/// The full ordered column set for a report year at a granularity.
///
/// Every report carries the complete set of columns for its granularity so
/// that rows line up regardless of which buckets actually hold hours.
#[must_use]
pub fn buckets_for_year(year: i32, granularity: Granularity) -> Vec<Bucket> {
    match granularity {
        Granularity::Yearly => vec![Bucket::Year(year)],
        Granularity::Quarterly => (1..=4).map(|q| Bucket::Quarter(year, q)).collect(),
        Granularity::Monthly => (1..=12).map(|m| Bucket::Month(year, m)).collect(),
        Granularity::Weekly => (1..=12)
            .flat_map(|m| (1..=MAX_WEEK).map(move |w| Bucket::Week(year, m, w)))
            .collect(),
    }
}
