//! Turning bucket counts into plottable series.

use anyhow::Result;
use chrono::NaiveDate;

use super::buckets::{AgeBuckets, Granularity, Period};

/// Rescale every period column to percentages of its total.
/// Columns with no cases stay at zero.
pub fn to_percentages(counts: &[Vec<u64>]) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = counts
        .iter()
        .map(|row| row.iter().map(|&c| c as f64).collect())
        .collect();
    let width = counts.first().map_or(0, Vec::len);
    for p in 0..width {
        let total: u64 = counts.iter().map(|row| row[p]).sum();
        if total == 0 {
            continue;
        }
        for row in out.iter_mut() {
            row[p] = 100.0 * row[p] / total as f64;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub label: String,
    pub values: Vec<f64>,
}

/// Date axis plus one layer per age group, youngest at the bottom of the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub dates: Vec<NaiveDate>,
    pub layers: Vec<Layer>,
    pub granularity: Granularity,
    pub percentages: bool,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Upper edge of each layer once stacked on the ones below it.
    pub fn stacked(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.0; self.dates.len()];
        self.layers
            .iter()
            .map(|layer| {
                for (acc, v) in running.iter_mut().zip(&layer.values) {
                    *acc += v;
                }
                running.clone()
            })
            .collect()
    }

    /// Height of the tallest stacked column.
    pub fn max_total(&self) -> f64 {
        self.stacked()
            .last()
            .map(|top| top.iter().copied().fold(0.0, f64::max))
            .unwrap_or(0.0)
    }
}

/// Index of the first period on or after the cutoff.
fn start_index(periods: &[Period], granularity: Granularity, cutoff: NaiveDate) -> usize {
    let target = Period::of(cutoff, granularity);
    periods.iter().position(|p| *p >= target).unwrap_or(periods.len())
}

/// Drop periods before the cutoff and pair the rest with axis dates.
///
/// Daily charts start at `daily_cutoff`. Weekly charts start at the ISO week that
/// contains `weekly_cutoff` and plot each week at its closing Sunday.
pub fn align(
    buckets: &AgeBuckets,
    daily_cutoff: NaiveDate,
    weekly_cutoff: NaiveDate,
    percentages: bool,
) -> Result<ChartSeries> {
    let cutoff = match buckets.granularity {
        Granularity::Daily => daily_cutoff,
        Granularity::Weekly => weekly_cutoff,
    };
    let start = start_index(&buckets.periods, buckets.granularity, cutoff);

    let dates = buckets.periods[start..]
        .iter()
        .map(|p| {
            p.axis_date()
                .ok_or_else(|| anyhow::anyhow!("no calendar date for period {:?}", p))
        })
        .collect::<Result<Vec<_>>>()?;

    let values: Vec<Vec<f64>> = if percentages {
        to_percentages(&buckets.counts)
    } else {
        buckets
            .counts
            .iter()
            .map(|row| row.iter().map(|&c| c as f64).collect())
            .collect()
    };

    let layers = buckets
        .groups
        .labels()
        .iter()
        .zip(values)
        .map(|(label, row)| Layer { label: label.clone(), values: row[start..].to_vec() })
        .collect();

    Ok(ChartSeries {
        dates,
        layers,
        granularity: buckets.granularity,
        percentages,
    })
}
