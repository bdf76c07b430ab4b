//! Nonlinear fitting of rate curves.
//!
//! - `primary`: `K / (c + t)^p` by bounded L-BFGS on log-rate residuals
//! - `comparison`: `K / (c + t)` by bounded Levenberg-Marquardt on linear residuals

pub mod comparison;
pub mod levenberg;
pub mod optimizer;
pub mod primary;

pub use comparison::fit_original_omori;
pub use primary::fit_modified_omori;
