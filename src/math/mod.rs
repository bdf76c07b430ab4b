//! Mathematical utilities: least squares, log-spaced grids, fit statistics.

pub mod ols;
pub mod spacing;
pub mod stats;

pub use ols::*;
pub use spacing::*;
pub use stats::*;
