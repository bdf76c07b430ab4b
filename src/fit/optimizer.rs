//! Box-constrained quasi-Newton minimisation on top of argmin.
//!
//! argmin's `LBFGS` is unconstrained. Each bounded coordinate is mapped through
//!
//! ```text
//! x = lo + (hi - lo) * sigmoid(θ)
//! ```
//!
//! so the solver works on an unbounded `θ` while the objective only ever sees
//! feasible `x`. The map is smooth, which keeps the More-Thuente line search
//! away from the kinks a hard clamp would introduce.

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{
    CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use tracing::debug;

use crate::domain::Bounds;
use crate::error::FitError;

/// Keeps `logit` finite when a start value sits on a bound.
const EDGE_EPS: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub max_iter: u64,
    /// Stop when the gradient norm (in `θ` space) falls below this.
    pub tol_grad: f64,
    /// Stop when successive costs differ by less than this.
    pub tol_cost: f64,
    /// L-BFGS history length.
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol_grad: 1e-6,
            tol_cost: 1e-12,
            m: 10,
        }
    }
}

/// A converged minimum, expressed in the original (bounded) coordinates.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub params: Vec<f64>,
    pub cost: f64,
    pub iterations: u64,
    pub cost_evaluations: usize,
    pub gradient_evaluations: usize,
}

/// Smooth scalar objective over bounded parameters.
pub trait Objective: Sync {
    fn cost(&self, x: &[f64]) -> f64;

    /// Central differences unless overridden.
    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; x.len()];
        let mut probe = x.to_vec();
        for i in 0..x.len() {
            let h = 1e-7 * x[i].abs().max(1.0);
            probe[i] = x[i] + h;
            let f_plus = self.cost(&probe);
            probe[i] = x[i] - h;
            let f_minus = self.cost(&probe);
            probe[i] = x[i];
            grad[i] = (f_plus - f_minus) / (2.0 * h);
        }
        grad
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Map unbounded `θ` into the box.
pub fn to_bounded(theta: &[f64], bounds: &[Bounds]) -> Vec<f64> {
    theta
        .iter()
        .zip(bounds)
        .map(|(&z, b)| b.lo + (b.hi - b.lo) * sigmoid(z))
        .collect()
}

/// Inverse of [`to_bounded`]; values on or past a bound are pulled just inside.
pub fn to_unbounded(x: &[f64], bounds: &[Bounds]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, b)| {
            let u = ((v - b.lo) / (b.hi - b.lo)).clamp(EDGE_EPS, 1.0 - EDGE_EPS);
            (u / (1.0 - u)).ln()
        })
        .collect()
}

struct Problem<'a> {
    objective: &'a dyn Objective,
    bounds: &'a [Bounds],
    cost_calls: AtomicUsize,
    grad_calls: AtomicUsize,
}

impl CostFunction for Problem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.cost_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.objective.cost(&to_bounded(theta, self.bounds)))
    }
}

impl Gradient for Problem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        self.grad_calls.fetch_add(1, Ordering::Relaxed);
        let x = to_bounded(theta, self.bounds);
        let gx = self.objective.gradient(&x);

        // Chain rule: dx/dθ = (hi - lo) * s * (1 - s).
        Ok(gx
            .iter()
            .zip(theta)
            .zip(self.bounds)
            .map(|((g, &z), b)| {
                let s = sigmoid(z);
                g * (b.hi - b.lo) * s * (1.0 - s)
            })
            .collect())
    }
}

/// L-BFGS with More-Thuente line search over a box.
pub struct BoundedLbfgs {
    config: OptimizerConfig,
}

impl BoundedLbfgs {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimise `objective` from `x0` subject to `bounds`.
    ///
    /// Anything other than a converged termination is an error: callers never
    /// see a best-effort point.
    pub fn minimize(
        &self,
        objective: &dyn Objective,
        x0: &[f64],
        bounds: &[Bounds],
    ) -> Result<Minimum, FitError> {
        if x0.len() != bounds.len() {
            return Err(FitError::NonConvergence {
                reason: format!(
                    "parameter and bounds length mismatch: {} != {}",
                    x0.len(),
                    bounds.len()
                ),
            });
        }
        if bounds
            .iter()
            .any(|b| !(b.lo.is_finite() && b.hi.is_finite() && b.lo < b.hi))
        {
            return Err(FitError::NonFinite { what: "parameter bounds" });
        }
        if x0.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { what: "initial guess" });
        }

        let problem = Problem {
            objective,
            bounds,
            cost_calls: AtomicUsize::new(0),
            grad_calls: AtomicUsize::new(0),
        };

        let solver = LBFGS::new(MoreThuenteLineSearch::new(), self.config.m)
            .with_tolerance_grad(self.config.tol_grad)?
            .with_tolerance_cost(self.config.tol_cost)?;

        let theta0 = to_unbounded(x0, bounds);
        let res = Executor::new(problem, solver)
            .configure(|state| state.param(theta0).max_iters(self.config.max_iter))
            .run()?;

        let state = res.state();
        let termination = state.get_termination_status().clone();
        let iterations = state.get_iter();
        let cost = state.get_best_cost();
        let theta = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| FitError::NonConvergence {
                reason: "solver returned no parameters".to_string(),
            })?;
        let (cost_evaluations, gradient_evaluations) =
            res.problem.problem.as_ref().map_or((0, 0), |p| {
                (
                    p.cost_calls.load(Ordering::Relaxed),
                    p.grad_calls.load(Ordering::Relaxed),
                )
            });

        debug!(
            iterations,
            cost,
            cost_evaluations,
            gradient_evaluations,
            termination = %termination,
            "lbfgs finished"
        );

        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        if !converged {
            return Err(FitError::NonConvergence {
                reason: termination.to_string(),
            });
        }

        let params = to_bounded(&theta, bounds);
        if params.iter().any(|v| !v.is_finite()) || !cost.is_finite() {
            return Err(FitError::NonFinite { what: "optimizer result" });
        }

        Ok(Minimum {
            params,
            cost,
            iterations,
            cost_evaluations,
            gradient_evaluations,
        })
    }
}

impl Default for BoundedLbfgs {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
