//! Temporal binning: irregular event times to a log-spaced rate curve.

pub mod log_bins;

pub use log_bins::bin_rates;
