//! fetch → filter → bucket → normalize, ending in a chart-ready series.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::chart::ChartTitle;
use crate::config::{AnalysisConfig, Config};
use crate::engine::filter::counties;
use crate::engine::{series, AgeBuckets, AgeGroups, ChartSeries, Granularity, Selection};
use crate::feed::types::CaseRecord;
use crate::feed::{fetch_all, FeatureSource};

/// What the user asked to see.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub selection: Selection,
    pub percentages: bool,
}

impl AnalysisRequest {
    pub fn granularity(&self) -> Granularity {
        Granularity::choose(
            self.selection.county.is_some(),
            self.selection.deaths_only,
            self.percentages,
        )
    }
}

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub step: &'static str,
    pub elapsed: Duration,
}

struct StepTimer {
    step: &'static str,
    started: Instant,
}

impl StepTimer {
    fn start(step: &'static str) -> Self {
        tracing::debug!(step, "step started");
        Self { step, started: Instant::now() }
    }

    fn finish(self, timings: &mut Vec<StepTiming>) {
        let elapsed = self.started.elapsed();
        tracing::info!(step = self.step, elapsed_ms = elapsed.as_millis() as u64, "step done");
        timings.push(StepTiming { step: self.step, elapsed });
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub series: ChartSeries,
    pub title: ChartTitle,
    /// Counties present in the unfiltered data.
    pub counties: Vec<String>,
    pub records_fetched: usize,
    pub records_selected: usize,
    pub timings: Vec<StepTiming>,
}

/// Fetch everything from `source`, then analyze it.
pub async fn run<S: FeatureSource + ?Sized>(
    source: &mut S,
    config: &Config,
    request: &AnalysisRequest,
) -> Result<Report> {
    let timer = StepTimer::start("fetch");
    let records = fetch_all(source, &config.source).await?;
    let mut timings = Vec::new();
    timer.finish(&mut timings);

    let mut report = analyze(records, &config.analysis, request)?;
    timings.append(&mut report.timings);
    report.timings = timings;
    Ok(report)
}

/// Fetch everything and return only the sorted county names.
pub async fn list_counties<S: FeatureSource + ?Sized>(
    source: &mut S,
    config: &Config,
) -> Result<Vec<String>> {
    let timer = StepTimer::start("fetch");
    let records = fetch_all(source, &config.source).await?;
    timer.finish(&mut Vec::new());
    Ok(counties(&records))
}

/// Everything after the fetch. Fails when the selection leaves nothing to plot.
pub fn analyze(
    records: Vec<CaseRecord>,
    config: &AnalysisConfig,
    request: &AnalysisRequest,
) -> Result<Report> {
    let mut timings = Vec::new();
    let records_fetched = records.len();
    let all_counties = counties(&records);

    let timer = StepTimer::start("filter");
    let selected = request.selection.apply(records);
    timer.finish(&mut timings);

    if selected.is_empty() {
        match &request.selection.county {
            Some(c) if !all_counties.contains(c) => {
                anyhow::bail!("county '{}' not found in the data ({} counties available)", c, all_counties.len())
            }
            _ => anyhow::bail!("no records match the selection ({} fetched)", records_fetched),
        }
    }

    let granularity = request.granularity();
    let groups = AgeGroups::select(config.older_only);
    let tz = config.tz()?;

    let timer = StepTimer::start("bucket");
    let buckets = AgeBuckets::build(&selected, groups, granularity, config.date_field, &tz);
    timer.finish(&mut timings);

    let timer = StepTimer::start("align");
    let series = series::align(
        &buckets,
        config.daily_cutoff,
        config.weekly_cutoff,
        request.percentages,
    )?;
    timer.finish(&mut timings);

    if series.is_empty() {
        anyhow::bail!(
            "no {} data on or after the cutoff (date field {})",
            match granularity {
                Granularity::Daily => "daily",
                Granularity::Weekly => "weekly",
            },
            config.date_field
        );
    }

    tracing::info!(
        fetched = records_fetched,
        selected = selected.len(),
        points = series.dates.len(),
        granularity = ?granularity,
        "analysis complete"
    );

    let title = ChartTitle {
        state: config.state_name.clone(),
        county: request.selection.county.clone(),
        deaths_only: request.selection.deaths_only,
        percentages: request.percentages,
        granularity,
    };

    Ok(Report {
        series,
        title,
        counties: all_counties,
        records_fetched,
        records_selected: selected.len(),
        timings,
    })
}
