//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use rfm_dashboard::data::aggregate::DEFAULT_HISTOGRAM_BINS;
use rfm_dashboard::data::export::EXPORT_FILE_NAME;
use rfm_dashboard::{CellValue, ClusterSelection, CustomerTable, FilterSpec, Interval, LabelingMode, RangeFilter};

/// Segment an RFM customer table and print summary metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input table (.csv, .json or .parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// How customers are labelled
    #[arg(short, long, value_enum, default_value_t = Mode::Score)]
    pub mode: Mode,

    /// Recency range as "min,max" (default: observed range)
    #[arg(long)]
    pub recency: Option<String>,

    /// Frequency range as "min,max" (default: observed range)
    #[arg(long)]
    pub frequency: Option<String>,

    /// Monetary range as "min,max" (default: observed range)
    #[arg(long)]
    pub monetary: Option<String>,

    /// Clusters to keep in cluster mode, comma-separated (default: all)
    #[arg(long, value_delimiter = ',')]
    pub clusters: Option<Vec<String>>,

    /// Write the labelled table as CSV (to RFM_segmented.csv if no path is given)
    #[arg(short, long, num_args = 0..=1, default_missing_value = EXPORT_FILE_NAME)]
    pub export: Option<PathBuf>,

    /// Number of bins for the distribution histograms
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rule-based segments from RFM_Score or R/F/M sub-scores
    Score,
    /// Precomputed Cluster column
    Cluster,
}

impl From<Mode> for LabelingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Score => LabelingMode::ScoreBased,
            Mode::Cluster => LabelingMode::ClusterBased,
        }
    }
}

/// Parse a closed interval from "min,max".
pub fn parse_interval(name: &str, spec: &str) -> Result<Interval> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 2 {
        bail!("{name} range must be in format 'min,max'");
    }
    let min: f64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {name} minimum: {}", parts[0]))?;
    let max: f64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {name} maximum: {}", parts[1]))?;
    if min > max {
        bail!("{name} range is empty: {min} > {max}");
    }
    Ok(Interval::new(min, max))
}

impl Args {
    /// Build the filter from the flags, defaulting to keep-everything.
    pub fn filter_for(&self, table: &CustomerTable, mode: LabelingMode) -> Result<FilterSpec> {
        match mode {
            LabelingMode::ScoreBased => {
                if self.clusters.is_some() {
                    log::warn!("--clusters is ignored in score mode");
                }
                let mut ranges = RangeFilter::observed(table);
                if let Some(spec) = &self.recency {
                    ranges.recency = parse_interval("Recency", spec)?;
                }
                if let Some(spec) = &self.frequency {
                    ranges.frequency = parse_interval("Frequency", spec)?;
                }
                if let Some(spec) = &self.monetary {
                    ranges.monetary = parse_interval("Monetary", spec)?;
                }
                Ok(FilterSpec::Ranges(ranges))
            }
            LabelingMode::ClusterBased => {
                if self.recency.is_some() || self.frequency.is_some() || self.monetary.is_some() {
                    log::warn!("range flags are ignored in cluster mode");
                }
                let Some(names) = &self.clusters else {
                    return Ok(FilterSpec::Clusters(ClusterSelection::all(table)));
                };
                let mut selection = ClusterSelection::default();
                for name in names {
                    let id = CellValue::parse(name);
                    if !table.clusters.contains(&id) {
                        bail!("Unknown cluster '{name}'");
                    }
                    selection.selected.insert(id);
                }
                Ok(FilterSpec::Clusters(selection))
            }
        }
    }
}
