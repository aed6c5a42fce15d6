use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::dates::{self, DateField};

pub const DEFAULT_CONFIG_FILE: &str = "agemix.toml";

const DEFAULT_QUERY_URL: &str = "https://services1.arcgis.com/CY1LXxl9zlJeBuRZ/arcgis/rest/services/Florida_COVID19_Case_Line_Data_NEW/FeatureServer/0/query";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_query_url")]
    pub query_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sleep after the server answers with an `error` object.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_s: u64,
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// Consecutive server errors tolerated at one offset. Unbounded when unset.
    #[serde(default)]
    pub max_error_retries: Option<u32>,
    /// Stop after this many pages (debugging against the live service).
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_query_url() -> String { DEFAULT_QUERY_URL.to_string() }
fn default_batch_size() -> usize { 2000 }
fn default_error_backoff() -> u64 { 30 }
fn default_page_delay() -> u64 { 100 }
fn default_request_timeout() -> u64 { 60_000 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            query_url: default_query_url(),
            batch_size: default_batch_size(),
            error_backoff_s: default_error_backoff(),
            page_delay_ms: default_page_delay(),
            max_error_retries: None,
            max_pages: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_state_name")]
    pub state_name: String,
    #[serde(default = "default_state_abbrev")]
    pub state_abbrev: String,
    /// IANA zone used to turn epoch-millisecond attributes into calendar dates.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default)]
    pub date_field: DateField,
    #[serde(default = "default_true")]
    pub older_only: bool,
    #[serde(default = "default_daily_cutoff")]
    pub daily_cutoff: NaiveDate,
    #[serde(default = "default_weekly_cutoff")]
    pub weekly_cutoff: NaiveDate,
}

fn default_state_name() -> String { "Florida".to_string() }
fn default_state_abbrev() -> String { "FL".to_string() }
fn default_time_zone() -> String { dates::DEFAULT_TIME_ZONE.to_string() }
fn default_true() -> bool { true }
fn default_daily_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap_or(NaiveDate::MIN)
}
fn default_weekly_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 2, 1).unwrap_or(NaiveDate::MIN)
}

impl AnalysisConfig {
    pub fn tz(&self) -> Result<Tz> {
        dates::time_zone(&self.time_zone).context("analysis.time_zone")
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            state_name: default_state_name(),
            state_abbrev: default_state_abbrev(),
            time_zone: default_time_zone(),
            date_field: DateField::default(),
            older_only: true,
            daily_cutoff: default_daily_cutoff(),
            weekly_cutoff: default_weekly_cutoff(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub interactive: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("images") }
fn default_width() -> u32 { 1500 }
fn default_height() -> u32 { 750 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
            interactive: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file means built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.source.batch_size == 0 {
            anyhow::bail!("source.batch_size must be greater than zero");
        }
        self.analysis.tz()?;
        if self.output.width < 16 || self.output.height < 16 {
            anyhow::bail!("output image must be at least 16x16 pixels");
        }
        Ok(())
    }

    /// Fold command-line overrides into the file-level settings.
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(field) = args.date_field {
            self.analysis.date_field = field;
        }
        if args.all_ages {
            self.analysis.older_only = false;
        }
        if args.no_tui {
            self.output.interactive = false;
        }
    }
}

/// Chart the age mix of a state's COVID-19 cases from its ArcGIS case-line layer.
#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(name = "agemix", version)]
pub struct CliArgs {
    /// Config file (defaults apply when it is missing)
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Limit to one county; statewide when omitted
    #[arg(long, value_name = "NAME")]
    pub county: Option<String>,

    /// Only records with Died = Yes
    #[arg(long = "deaths")]
    pub deaths_only: bool,

    /// Plot raw counts instead of percentages
    #[arg(long)]
    pub counts: bool,

    /// Chart all ten age brackets, not just 65+
    #[arg(long)]
    pub all_ages: bool,

    /// Date attribute to bin by
    #[arg(long, value_enum, ignore_case = true)]
    pub date_field: Option<DateField>,

    /// Print the counties present in the data and exit
    #[arg(long)]
    pub list_counties: bool,

    /// Skip the interactive terminal chart
    #[arg(long)]
    pub no_tui: bool,
}

impl CliArgs {
    pub fn config_path(&self) -> &Path {
        self.config_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE))
    }

    /// The requested county, with a blank name meaning statewide.
    pub fn county(&self) -> Option<String> {
        self.county
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}
