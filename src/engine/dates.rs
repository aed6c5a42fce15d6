//! Date normalization for case-line records.
//!
//! Every record carries three timestamps (epoch milliseconds) with different meanings:
//!
//! - `Case_`: the positive lab result reached the health department's database and became
//!   a confirmed case. Not the date of infection, symptoms or treatment.
//! - `EventDate`: the earliest date associated with the case, either self-reported symptom
//!   onset or the lab report date. The most consistent of the three.
//! - `ChartDate`: the date the case was listed on the public dashboard. News coverage
//!   mostly follows this one.

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;

use crate::feed::types::CaseRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
pub enum DateField {
    #[serde(rename = "Case_", alias = "CaseDate")]
    #[value(name = "case", alias = "case_")]
    CaseDate,
    #[default]
    #[value(name = "event")]
    EventDate,
    #[value(name = "chart")]
    ChartDate,
}

impl DateField {
    /// Attribute name on the feature layer.
    pub fn attribute(self) -> &'static str {
        match self {
            DateField::CaseDate => "Case_",
            DateField::EventDate => "EventDate",
            DateField::ChartDate => "ChartDate",
        }
    }

    pub fn millis(self, record: &CaseRecord) -> Option<i64> {
        match self {
            DateField::CaseDate => record.case_date,
            DateField::EventDate => record.event_date,
            DateField::ChartDate => record.chart_date,
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Zone the state reports in when none is configured.
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

/// Look up an IANA zone name such as `America/New_York`.
pub fn time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("unknown time zone '{}': {}", name, e))
}

/// Epoch milliseconds to the calendar date in `tz`, daylight saving included.
pub fn millis_to_date(millis: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(tz).date_naive())
}

/// The calendar date of `record` according to `field`, or `None` when the attribute is null.
pub fn record_date(record: &CaseRecord, field: DateField, tz: &Tz) -> Option<NaiveDate> {
    field.millis(record).and_then(|ms| millis_to_date(ms, tz))
}

/// ISO-8601 week. Ordered by year, then week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Week {
    pub year: i32,
    pub week: u32,
}

impl Week {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self { year: iso.year(), week: iso.week() }
    }

    /// The Sunday that closes this week, used as its point on the date axis.
    pub fn label_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Sun)
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Every calendar day from `start` to `end`, inclusive. Empty if `end < start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut d = start;
    while d <= end {
        out.push(d);
        d += Duration::days(1);
    }
    out
}
