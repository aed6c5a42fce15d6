pub mod png;

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::engine::{ChartSeries, Granularity};

/// RGB fill per layer, cycled when there are more layers than colours.
pub const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

pub fn layer_color(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

/// Stacked edges at a fractional x position (0.0 = first date, 1.0 = last).
pub fn edges_at(series: &ChartSeries, stacked: &[Vec<f64>], t: f64) -> Vec<f64> {
    let Some(&first) = series.dates.first() else {
        return vec![0.0; stacked.len()];
    };
    let span = (series.dates[series.dates.len() - 1] - first).num_days() as f64;
    if span <= 0.0 {
        return stacked.iter().map(|e| e[0]).collect();
    }
    let x = t * span;
    let day = |i: usize| (series.dates[i] - first).num_days() as f64;

    let mut seg = 0;
    while seg + 2 < series.dates.len() && day(seg + 1) < x {
        seg += 1;
    }
    let (x0, x1) = (day(seg), day(seg + 1));
    let w = if x1 > x0 { ((x - x0) / (x1 - x0)).clamp(0.0, 1.0) } else { 0.0 };
    stacked
        .iter()
        .map(|e| e[seg] + (e[seg + 1] - e[seg]) * w)
        .collect()
}

/// What the chart is about. Drives the title text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTitle {
    pub state: String,
    pub county: Option<String>,
    pub deaths_only: bool,
    pub percentages: bool,
    pub granularity: Granularity,
}

impl ChartTitle {
    pub fn text(&self) -> String {
        let subject = if self.deaths_only { "Deaths" } else { "Positives" };
        // A county chart is always weekly, whatever the granularity flag says.
        let period = match (&self.county, self.granularity) {
            (Some(_), _) | (None, Granularity::Weekly) => "Week's",
            (None, Granularity::Daily) => "Day's",
        };
        let place = match &self.county {
            Some(c) => format!(" in {} County", c),
            None => String::new(),
        };
        if self.percentages {
            format!(
                "{} Covid-19 {}{} By Age Bracket as % of {} Total",
                self.state, subject, place, period
            )
        } else {
            format!(
                "{} Covid-19 {}{} By Age Bracket, {} Total",
                self.state, subject, place, period
            )
        }
    }
}

/// `<dir>/<date>-ages-<abbrev>[-<county>].png`
pub fn output_path(dir: &Path, today: NaiveDate, state_abbrev: &str, county: Option<&str>) -> PathBuf {
    let name = match county {
        Some(c) => format!("{}-ages-{}-{}.png", today.format("%Y-%m-%d"), state_abbrev, c),
        None => format!("{}-ages-{}.png", today.format("%Y-%m-%d"), state_abbrev),
    };
    dir.join(name)
}
