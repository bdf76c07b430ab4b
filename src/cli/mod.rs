//! Command-line parsing for the aftershock decay analyzer.
//!
//! Argument parsing and command dispatch stay separate from the binning and
//! fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AnalysisConfig, TimeUnit};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "omori", version, about = "Omori-Utsu aftershock decay fitting")]
pub struct Cli {
    /// Enable debug logging (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bin and fit every sequence in a catalog, print a summary, and optionally export.
    Analyze(AnalyzeArgs),
    /// Write a synthetic catalog drawn from a known Omori-Utsu law.
    Simulate(SimulateArgs),
    /// Re-print the summary of a previously written results file.
    Summary(SummaryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Catalog JSON produced by the collector.
    #[arg(short, long, value_name = "JSON", env = "OMORI_INPUT")]
    pub input: PathBuf,

    /// Write per-sequence results (including rate curves) to JSON.
    #[arg(short, long, value_name = "JSON", env = "OMORI_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Write a flat per-sequence CSV summary.
    #[arg(long, value_name = "CSV")]
    pub summary_csv: Option<PathBuf>,

    /// Elapsed-time column to analyse.
    #[arg(long, value_enum, default_value_t = TimeUnit::Hours)]
    pub time_unit: TimeUnit,

    /// Lower clamp for the earliest elapsed time, in `--time-unit` units.
    #[arg(long, default_value_t = crate::domain::MIN_ELAPSED_TIME)]
    pub min_time: f64,

    /// Minimum raw events per sequence (at least 1).
    #[arg(long, default_value_t = 20, value_parser = parse_positive)]
    pub min_events: usize,

    /// R² above which a fit counts as good in the summary.
    #[arg(long = "min-r2", default_value_t = 0.5)]
    pub min_r2: f64,

    /// Analyse sequences one at a time instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Suppress the per-sequence progress lines.
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl AnalyzeArgs {
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            time_unit: self.time_unit,
            min_time: self.min_time,
            min_events: self.min_events,
            good_fit_r_squared: self.min_r2,
            parallel: !self.sequential,
            ..AnalysisConfig::default()
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output catalog JSON.
    #[arg(short, long, value_name = "JSON")]
    pub output: PathBuf,

    /// Number of sequences.
    #[arg(long, default_value_t = 10)]
    pub sequences: usize,

    /// Events per sequence; omit to draw a Poisson count from the integrated rate.
    #[arg(long)]
    pub events: Option<usize>,

    #[arg(short = 'k', long = "k", default_value_t = 50.0)]
    pub k: f64,

    #[arg(short, long, default_value_t = 0.1)]
    pub c: f64,

    #[arg(short, long, default_value_t = 1.1)]
    pub p: f64,

    /// Start of the observation window (hours).
    #[arg(long, default_value_t = 0.1)]
    pub t_min: f64,

    /// End of the observation window (hours).
    #[arg(long, default_value_t = 1000.0)]
    pub t_max: f64,

    #[arg(long, default_value_t = 6.5)]
    pub magnitude: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Results JSON written by `omori analyze --output`.
    #[arg(short, long, value_name = "JSON")]
    pub results: PathBuf,

    /// R² above which a fit counts as good.
    #[arg(long = "min-r2", default_value_t = 0.5)]
    pub min_r2: f64,
}
