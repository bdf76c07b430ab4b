//! `omori-fit` library crate.
//!
//! The binary (`omori`) is a thin wrapper around this library so that:
//!
//! - binning and fitting are testable without spawning processes
//! - the pipeline can be driven from other front-ends
//!
//! Flow: catalog -> [`binning`] -> [`fit`] -> [`app::pipeline`] records -> [`report`].

pub mod app;
pub mod binning;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
