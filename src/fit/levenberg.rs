//! Bounded Levenberg-Marquardt for small nonlinear least-squares problems.
//!
//! Each iteration solves the Marquardt-scaled damped system over the free
//! parameters as a tall least squares problem:
//!
//! ```text
//! [ J_F          ]        [ -r ]
//! [ sqrt(λ)·D_F  ] δ_F ≈  [  0 ]      D = diag(‖J[:, j]‖)
//! ```
//!
//! A parameter sitting on a bound is held fixed while its step points out of
//! the box. Steps that would leave the box are shortened to land on the first
//! bound they cross. Accepted steps shrink λ, rejected ones grow it.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::Bounds;
use crate::error::FitError;
use crate::math::solve_least_squares;

/// Residual vector and Jacobian of a least-squares problem.
pub trait Residuals {
    fn residuals(&self, x: &[f64]) -> Vec<f64>;
    fn jacobian(&self, x: &[f64]) -> DMatrix<f64>;
}

#[derive(Debug, Clone)]
pub struct LevenbergConfig {
    /// Cap on residual evaluations.
    pub max_evaluations: usize,
    /// Relative decrease of the sum of squares treated as converged.
    pub ftol: f64,
    /// Relative step length treated as converged.
    pub xtol: f64,
    pub initial_lambda: f64,
}

impl Default for LevenbergConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            ftol: 1e-12,
            xtol: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub ssr: f64,
    pub evaluations: usize,
}

const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e16;

fn project(x: &[f64], bounds: &[Bounds]) -> Vec<f64> {
    x.iter().zip(bounds).map(|(&v, b)| b.clamp(v)).collect()
}

fn sum_sq(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

fn norm(x: &[f64]) -> f64 {
    sum_sq(x).sqrt()
}

/// True when `x` sits on a bound and moving by `direction` would leave the box.
fn blocked(x: f64, direction: f64, b: &Bounds) -> bool {
    (x <= b.lo && direction < 0.0) || (x >= b.hi && direction > 0.0)
}

/// Damped step over the columns in `free`; fixed parameters get a zero step.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &[f64],
    scale: &[f64],
    lambda: f64,
    free: &[usize],
) -> Result<Vec<f64>, FitError> {
    let (n_res, n_params) = jac.shape();
    let n_free = free.len();

    let mut a = DMatrix::<f64>::zeros(n_res + n_free, n_free);
    for (col, &j) in free.iter().enumerate() {
        for i in 0..n_res {
            a[(i, col)] = jac[(i, j)];
        }
        a[(n_res + col, col)] = lambda.sqrt() * scale[j];
    }
    let mut b = DVector::<f64>::zeros(n_res + n_free);
    for i in 0..n_res {
        b[i] = -r[i];
    }

    let reduced = solve_least_squares(&a, &b).ok_or(FitError::Singular)?;
    let mut step = vec![0.0; n_params];
    for (col, &j) in free.iter().enumerate() {
        step[j] = reduced[col];
    }
    Ok(step)
}

/// Solve for the step, dropping parameters pinned against a bound until the
/// remaining step points into the box. `None` when every parameter is pinned.
fn active_set_step(
    x: &[f64],
    jac: &DMatrix<f64>,
    r: &[f64],
    scale: &[f64],
    lambda: f64,
    bounds: &[Bounds],
) -> Result<Option<Vec<f64>>, FitError> {
    // Descent direction of the sum of squares is -Jᵀr.
    let descent: Vec<f64> = (0..x.len())
        .map(|j| -jac.column(j).iter().zip(r).map(|(a, b)| a * b).sum::<f64>())
        .collect();
    let mut free: Vec<usize> = (0..x.len())
        .filter(|&j| !blocked(x[j], descent[j], &bounds[j]))
        .collect();

    while !free.is_empty() {
        let step = damped_step(jac, r, scale, lambda, &free)?;
        let before = free.len();
        free.retain(|&j| !blocked(x[j], step[j], &bounds[j]));
        if free.len() == before {
            return Ok(Some(step));
        }
    }
    Ok(None)
}

/// Largest `α ≤ 1` keeping `x + α·step` inside the box, with the parameter
/// and bound value that limit it.
fn step_to_boundary(x: &[f64], step: &[f64], bounds: &[Bounds]) -> (f64, Option<(usize, f64)>) {
    let mut alpha = 1.0;
    let mut hit = None;
    for (j, ((&xi, &di), b)) in x.iter().zip(step).zip(bounds).enumerate() {
        let (limit, edge) = if di > 0.0 && xi + di > b.hi {
            ((b.hi - xi) / di, b.hi)
        } else if di < 0.0 && xi + di < b.lo {
            ((b.lo - xi) / di, b.lo)
        } else {
            continue;
        };
        if limit < alpha {
            alpha = limit;
            hit = Some((j, edge));
        }
    }
    (alpha, hit)
}

/// Minimise `Σ r_i(x)²` subject to `bounds`.
///
/// Fails when the evaluation cap is exhausted or the iteration produces
/// non-finite values. If the damping grows past its ceiling without finding a
/// better point, or every parameter is pinned against a bound, the current
/// point is returned: no step inside the box improves the sum of squares.
pub fn minimize_bounded(
    problem: &dyn Residuals,
    x0: &[f64],
    bounds: &[Bounds],
    config: &LevenbergConfig,
) -> Result<LeastSquaresFit, FitError> {
    if x0.len() != bounds.len() {
        return Err(FitError::NonConvergence {
            reason: format!(
                "parameter and bounds length mismatch: {} != {}",
                x0.len(),
                bounds.len()
            ),
        });
    }

    let mut x = project(x0, bounds);
    let mut r = problem.residuals(&x);
    let mut ssr = sum_sq(&r);
    let mut evaluations = 1;
    let mut lambda = config.initial_lambda;

    if !ssr.is_finite() {
        return Err(FitError::NonFinite { what: "initial residuals" });
    }

    while evaluations < config.max_evaluations {
        let jac = problem.jacobian(&x);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { what: "jacobian" });
        }
        let scale: Vec<f64> = (0..x.len()).map(|j| jac.column(j).norm()).collect();

        loop {
            let Some(step) = active_set_step(&x, &jac, &r, &scale, lambda, bounds)? else {
                debug!(evaluations, ssr, "levenberg-marquardt pinned at a corner");
                return Ok(LeastSquaresFit {
                    params: x,
                    ssr,
                    evaluations,
                });
            };
            let (alpha, hit) = step_to_boundary(&x, &step, bounds);
            let trial: Vec<f64> = x
                .iter()
                .zip(&step)
                .map(|(xi, di)| xi + alpha * di)
                .collect();
            let mut trial = project(&trial, bounds);
            // Land exactly on the bound so the next iteration sees it as active.
            if let Some((j, edge)) = hit {
                trial[j] = edge;
            }
            let trial_r = problem.residuals(&trial);
            let trial_ssr = sum_sq(&trial_r);
            evaluations += 1;

            if trial_ssr.is_finite() && trial_ssr <= ssr {
                let moved: Vec<f64> = trial.iter().zip(&x).map(|(a, b)| a - b).collect();
                let step_len = norm(&moved);
                let rel_decrease = (ssr - trial_ssr) / ssr.max(f64::MIN_POSITIVE);

                x = trial;
                r = trial_r;
                ssr = trial_ssr;
                lambda = (lambda / 10.0).max(MIN_LAMBDA);

                // A shortened step only pins a new bound.
                if hit.is_none()
                    && (rel_decrease < config.ftol
                        || step_len <= config.xtol * (config.xtol + norm(&x)))
                {
                    debug!(evaluations, ssr, "levenberg-marquardt converged");
                    return Ok(LeastSquaresFit {
                        params: x,
                        ssr,
                        evaluations,
                    });
                }
                break;
            }

            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                debug!(evaluations, ssr, "levenberg-marquardt stalled at a local minimum");
                return Ok(LeastSquaresFit {
                    params: x,
                    ssr,
                    evaluations,
                });
            }
            if evaluations >= config.max_evaluations {
                break;
            }
        }
    }

    Err(FitError::NonConvergence {
        reason: format!("evaluation limit of {} reached", config.max_evaluations),
    })
}
