//! Binning records into age-group × period counts.

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::{BTreeSet, HashMap};

use super::dates::{date_range, record_date, DateField, Week};
use crate::feed::types::CaseRecord;

const ALL_GROUPS: [&str; 10] = [
    "0-4 years",
    "5-14 years",
    "15-24 years",
    "25-34 years",
    "35-44 years",
    "45-54 years",
    "55-64 years",
    "65-74 years",
    "75-84 years",
    "85+ years",
];

/// Ordered age-group labels, youngest first. The order is the stacking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeGroups(Vec<String>);

impl AgeGroups {
    pub fn all() -> Self {
        Self(ALL_GROUPS.iter().map(|s| s.to_string()).collect())
    }

    /// 65 and over only.
    pub fn older() -> Self {
        Self(ALL_GROUPS[7..].iter().map(|s| s.to_string()).collect())
    }

    pub fn select(older_only: bool) -> Self {
        if older_only { Self::older() } else { Self::all() }
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|g| g == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Weekly,
}

impl Granularity {
    /// County views, death views and raw counts are too sparse per day, so they go weekly.
    pub fn choose(county_selected: bool, deaths_only: bool, percentages: bool) -> Self {
        if county_selected || deaths_only || !percentages {
            Granularity::Weekly
        } else {
            Granularity::Daily
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Day(NaiveDate),
    Week(Week),
}

impl Period {
    pub fn of(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => Period::Day(date),
            Granularity::Weekly => Period::Week(Week::of(date)),
        }
    }

    /// Where this period sits on the chart's date axis.
    pub fn axis_date(&self) -> Option<NaiveDate> {
        match self {
            Period::Day(d) => Some(*d),
            Period::Week(w) => w.label_date(),
        }
    }
}

/// `counts[g][p]`: records of age group `g` dated within `periods[p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBuckets {
    pub groups: AgeGroups,
    pub granularity: Granularity,
    pub periods: Vec<Period>,
    pub counts: Vec<Vec<u64>>,
}

impl AgeBuckets {
    pub fn build(
        records: &[CaseRecord],
        groups: AgeGroups,
        granularity: Granularity,
        field: DateField,
        tz: &Tz,
    ) -> Self {
        let dated: Vec<(NaiveDate, &CaseRecord)> = records
            .iter()
            .filter_map(|r| record_date(r, field, tz).map(|d| (d, r)))
            .collect();

        let periods = period_axis(dated.iter().map(|(d, _)| *d), granularity);
        let column: HashMap<Period, usize> =
            periods.iter().enumerate().map(|(i, p)| (*p, i)).collect();

        let mut counts = vec![vec![0u64; periods.len()]; groups.len()];
        let mut unmatched = 0usize;
        for (date, record) in &dated {
            let Some(g) = record.age_group.as_deref().and_then(|a| groups.index_of(a)) else {
                unmatched += 1;
                continue;
            };
            if let Some(&p) = column.get(&Period::of(*date, granularity)) {
                counts[g][p] += 1;
            }
        }

        tracing::debug!(
            records = records.len(),
            dated = dated.len(),
            outside_groups = unmatched,
            periods = periods.len(),
            "age buckets built"
        );

        Self { groups, granularity, periods, counts }
    }

    /// Column sums.
    pub fn totals(&self) -> Vec<u64> {
        (0..self.periods.len())
            .map(|p| self.counts.iter().map(|row| row[p]).sum())
            .collect()
    }
}

/// Daily: every day from the earliest to the latest date seen.
/// Weekly: only the weeks that occur, in order.
fn period_axis<I>(dates: I, granularity: Granularity) -> Vec<Period>
where
    I: Iterator<Item = NaiveDate>,
{
    match granularity {
        Granularity::Daily => {
            let mut min: Option<NaiveDate> = None;
            let mut max: Option<NaiveDate> = None;
            for d in dates {
                min = Some(min.map_or(d, |m| m.min(d)));
                max = Some(max.map_or(d, |m| m.max(d)));
            }
            match (min, max) {
                (Some(lo), Some(hi)) => date_range(lo, hi).into_iter().map(Period::Day).collect(),
                _ => Vec::new(),
            }
        }
        Granularity::Weekly => dates
            .map(|d| Period::Week(Week::of(d)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}
