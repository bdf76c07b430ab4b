//! Model evaluation for the Omori family.
//!
//! The fitters rely on two primitive operations per model:
//! - predict the rate at elapsed time `t` (scalar and whole-curve forms)
//! - partial derivatives with respect to the parameters (gradient / Jacobian rows)
//!
//! Both are pure; nothing here holds state.

use crate::domain::ModelParams;

/// Omori-Utsu rate `K / (c + t)^p`.
///
/// Only meaningful for `c + t > 0`.
pub fn primary(t: f64, k: f64, c: f64, p: f64) -> f64 {
    k / (c + t).powf(p)
}

/// Original Omori rate `K / (c + t)`; identical to [`primary`] with `p = 1`.
pub fn comparison(t: f64, k: f64, c: f64) -> f64 {
    k / (c + t)
}

/// Evaluate [`primary`] over a whole time array.
pub fn predict_primary(times: &[f64], params: &ModelParams) -> Vec<f64> {
    times
        .iter()
        .map(|&t| primary(t, params.k, params.c, params.p))
        .collect()
}

/// Evaluate [`comparison`] over a whole time array.
pub fn predict_comparison(times: &[f64], k: f64, c: f64) -> Vec<f64> {
    times.iter().map(|&t| comparison(t, k, c)).collect()
}

/// `[∂/∂K, ∂/∂c, ∂/∂p]` of [`primary`] at `t`.
pub fn primary_gradient(t: f64, k: f64, c: f64, p: f64) -> [f64; 3] {
    let base = c + t;
    let rate = primary(t, k, c, p);
    [rate / k, -p * rate / base, -rate * base.ln()]
}

/// `[∂/∂K, ∂/∂c]` of [`comparison`] at `t` (one Jacobian row).
pub fn comparison_jacobian_row(t: f64, k: f64, c: f64) -> [f64; 2] {
    let base = c + t;
    [1.0 / base, -k / (base * base)]
}
