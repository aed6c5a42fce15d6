use agemix::chart::{self, png};
use agemix::config::{CliArgs, Config};
use agemix::engine::Selection;
use agemix::feed::arcgis::ArcGisSource;
use agemix::pipeline::{self, AnalysisRequest};
use agemix::tui::{self, state::ChartView};
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "agemix.log";

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create(LOG_FILE)
        .with_context(|| format!("Failed to create log file: {}", LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agemix=info")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let args = CliArgs::parse();
    let mut config = Config::load_or_default(args.config_path())?;
    config.apply_args(&args);

    let request = AnalysisRequest {
        selection: Selection {
            county: args.county(),
            deaths_only: args.deaths_only,
        },
        percentages: !args.counts,
    };

    println!();
    println!("  Age mix of COVID-19 cases, {} v{}", config.analysis.state_name, env!("CARGO_PKG_VERSION"));
    println!("  ==========================================");
    println!();
    println!(
        "  Scope: {}  |  {}  |  {}  |  by {}",
        request.selection.county.as_deref().map_or("statewide".to_string(), |c| format!("{} County", c)),
        if request.selection.deaths_only { "deaths" } else { "positives" },
        if request.percentages { "% of total" } else { "counts" },
        config.analysis.date_field,
    );
    println!("  Fetching records (log: {}) ...", LOG_FILE);

    let started = Instant::now();
    let mut source = ArcGisSource::new(&config.source)?;

    if args.list_counties {
        for county in pipeline::list_counties(&mut source, &config).await? {
            println!("  {}", county);
        }
        return Ok(());
    }

    let report = pipeline::run(&mut source, &config, &request).await?;

    println!("  {}", report.title.text());
    println!(
        "  {} records fetched, {} selected, {} points",
        report.records_fetched,
        report.records_selected,
        report.series.dates.len()
    );
    println!("  {} counties in the data", report.counties.len());
    for timing in &report.timings {
        println!("    {:<8} {:>8.2}s", timing.step, timing.elapsed.as_secs_f64());
    }

    let today = chrono::Local::now().date_naive();
    let path = chart::output_path(
        &config.output.dir,
        today,
        &config.analysis.state_abbrev,
        request.selection.county.as_deref(),
    );
    png::render(&report.series, &path, config.output.width, config.output.height)?;

    println!("  Chart written to {}", path.display());
    println!("  Finished in {:.2}s", started.elapsed().as_secs_f64());
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "run finished");

    if config.output.interactive {
        let view = ChartView::new(report.title.text(), report.series, report.records_selected);
        tui::run_tui(view)?;
    }

    Ok(())
}
