use crate::engine::ChartSeries;

/// Everything the chart screen needs to draw itself.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub title: String,
    pub series: ChartSeries,
    /// Records that survived filtering, for the footer.
    pub record_count: usize,
    pub show_legend: bool,
}

impl ChartView {
    pub fn new(title: String, series: ChartSeries, record_count: usize) -> Self {
        Self {
            title,
            series,
            record_count,
            show_legend: true,
        }
    }

    pub fn toggle_legend(&mut self) {
        self.show_legend = !self.show_legend;
    }

    /// "2020-03-01 .. 2020-06-24", or "no data" when the series is empty.
    pub fn date_span(&self) -> String {
        match (self.series.dates.first(), self.series.dates.last()) {
            (Some(first), Some(last)) => format!("{} .. {}", first, last),
            _ => "no data".to_string(),
        }
    }
}
