//! Top-level application orchestration.
//!
//! `src/main.rs` only forwards here. This module:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - runs the analysis pipeline or the synthetic generator
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Cli, Command, SimulateArgs, SummaryArgs};
use crate::data::synthetic::{SyntheticSpec, generate_catalog};
use crate::error::AppError;
use crate::report::{format_record_line, format_summary, summarize};

pub mod pipeline;

/// Entry point for the `omori` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Summary(args) => handle_summary(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = args.analysis_config();
    info!(
        input = %args.input.display(),
        time_unit = config.time_unit.label(),
        parallel = config.parallel,
        "starting analysis"
    );
    let run = pipeline::run_analysis(&args.input, &config)?;

    if !args.quiet {
        let total = run.records.len();
        for (i, record) in run.records.iter().enumerate() {
            println!("{}", format_record_line(i, total, record));
        }
        println!();
    }
    println!("{}", format_summary(&run.summary));

    if let Some(path) = &args.output {
        crate::io::write_records_json(path, &run.records)?;
        info!(path = %path.display(), "wrote results");
    }
    if let Some(path) = &args.summary_csv {
        crate::io::write_summary_csv(path, &run.records)?;
        info!(path = %path.display(), "wrote summary csv");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    if args.sequences == 0 {
        return Err(AppError::new(2, "Sequence count must be > 0."));
    }
    let spec = SyntheticSpec {
        events: args.events,
        k: args.k,
        c: args.c,
        p: args.p,
        t_min: args.t_min,
        t_max: args.t_max,
        mainshock_magnitude: args.magnitude,
    };
    let catalog = generate_catalog(&spec, args.sequences, args.seed)?;
    crate::io::write_catalog(&args.output, &catalog)?;

    let events: usize = catalog.sequences.iter().map(|s| s.aftershocks.len()).sum();
    println!(
        "Wrote {} synthetic sequences ({} events, K={}, c={}, p={}) to {}",
        catalog.sequences.len(),
        events,
        spec.k,
        spec.c,
        spec.p,
        args.output.display()
    );
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let records = crate::io::read_records_json(&args.results)?;
    println!("{}", format_summary(&summarize(&records, args.min_r2)));
    Ok(())
}
