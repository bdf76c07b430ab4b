//! Three-parameter (modified Omori) fit in log-rate space.

use std::f64::consts::LN_10;

use tracing::debug;

use crate::domain::{AnalysisConfig, ModelFit, ModelParams, RateCurve};
use crate::error::FitError;
use crate::fit::optimizer::{BoundedLbfgs, Objective, OptimizerConfig};
use crate::math::{LOG_FLOOR, log10_floored, r_squared_log, rmse};
use crate::models::{predict_primary, primary, primary_gradient};

/// Returned for parameter vectors where the model is undefined.
const PENALTY: f64 = 1e10;

/// `Σ (log10(pred) - log10(obs))²` with the `LOG_FLOOR` offset on both sides.
struct LogResidualObjective<'a> {
    times: &'a [f64],
    log_rates: Vec<f64>,
}

impl<'a> LogResidualObjective<'a> {
    fn new(curve: &'a RateCurve) -> Self {
        Self {
            times: curve.times(),
            log_rates: curve.rates().iter().map(|&r| log10_floored(r)).collect(),
        }
    }
}

fn undefined(x: &[f64]) -> bool {
    x[0] <= 0.0 || x[1] <= 0.0 || x[2] <= 0.0
}

impl Objective for LogResidualObjective<'_> {
    fn cost(&self, x: &[f64]) -> f64 {
        if undefined(x) {
            return PENALTY;
        }
        let (k, c, p) = (x[0], x[1], x[2]);
        self.times
            .iter()
            .zip(&self.log_rates)
            .map(|(&t, &obs)| {
                let res = log10_floored(primary(t, k, c, p)) - obs;
                res * res
            })
            .sum()
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        if undefined(x) {
            return vec![0.0; 3];
        }
        let (k, c, p) = (x[0], x[1], x[2]);
        let mut grad = vec![0.0; 3];
        for (&t, &obs) in self.times.iter().zip(&self.log_rates) {
            let pred = primary(t, k, c, p);
            let res = log10_floored(pred) - obs;
            let scale = 2.0 * res / ((pred + LOG_FLOOR) * LN_10);
            for (g, d) in grad.iter_mut().zip(primary_gradient(t, k, c, p)) {
                *g += scale * d;
            }
        }
        grad
    }
}

/// Fit `K / (c + t)^p` to a rate curve.
///
/// Curves shorter than `config.min_fit_points` are rejected before the
/// optimizer runs. The start point is `K = rate[0] * time[0]` with the
/// configured `c`/`p` seeds, all clamped into their bounds.
pub fn fit_modified_omori(curve: &RateCurve, config: &AnalysisConfig) -> Result<ModelFit, FitError> {
    if curve.len() < config.min_fit_points {
        return Err(FitError::InsufficientBins {
            found: curve.len(),
            required: config.min_fit_points,
        });
    }

    let times = curve.times();
    let rates = curve.rates();
    let bounds = [config.k_bounds, config.c_bounds, config.p_bounds];
    let x0 = [
        config.k_bounds.clamp(rates[0] * times[0]),
        config.c_bounds.clamp(config.c_init),
        config.p_bounds.clamp(config.p_init),
    ];

    let optimizer = BoundedLbfgs::new(OptimizerConfig {
        max_iter: config.max_iter,
        ..OptimizerConfig::default()
    });
    let objective = LogResidualObjective::new(curve);
    let minimum = optimizer.minimize(&objective, &x0, &bounds)?;

    let params = ModelParams {
        k: minimum.params[0],
        c: minimum.params[1],
        p: minimum.params[2],
    };
    for ((name, value), b) in ["K", "c", "p"].into_iter().zip(params.as_array()).zip(bounds) {
        if !b.contains(value) {
            return Err(FitError::OutOfBounds { name, value });
        }
    }

    let predicted = predict_primary(times, &params);
    let r_squared = r_squared_log(rates, &predicted);
    let rmse = rmse(rates, &predicted);
    if !r_squared.is_finite() || !rmse.is_finite() {
        return Err(FitError::NonFinite { what: "fit statistics" });
    }

    debug!(
        k = params.k,
        c = params.c,
        p = params.p,
        r_squared,
        iterations = minimum.iterations,
        "modified omori fit"
    );

    Ok(ModelFit {
        params,
        r_squared,
        rmse,
    })
}
