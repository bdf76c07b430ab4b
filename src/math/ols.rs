//! Small dense least-squares solves.
//!
//! The comparison fit repeatedly solves damped Gauss-Newton systems of the form:
//!
//! ```text
//! minimize || [J; sqrt(λ)·D] δ - [-r; 0] ||²
//! ```
//!
//! The matrices are tall (one row per rate bin plus one per parameter) and only
//! two columns wide, so an SVD is cheap and behaves well when `J` is close to
//! rank-deficient (e.g. `c` pinned against a bound).
//! Nalgebra's `QR::solve` is intended for square systems and panics on tall ones.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
