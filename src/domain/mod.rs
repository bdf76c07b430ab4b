//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records (`Mainshock`, `Aftershock`, `Sequence`, `Catalog`)
//! - the binned rate curve (`RateCurve`)
//! - fit outputs (`ModelFit`, `ComparisonFit`, `FitOutcome`, `AnalysisRecord`)
//! - run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
