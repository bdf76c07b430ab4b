//! Two-parameter (original Omori, `p = 1`) fit on linear residuals.
//!
//! This fit is supplementary: every failure is logged and turned into `None`.

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{AnalysisConfig, ComparisonFit, RateCurve};
use crate::error::FitError;
use crate::fit::levenberg::{LevenbergConfig, Residuals, minimize_bounded};
use crate::math::r_squared_log;
use crate::models::{comparison, comparison_jacobian_row, predict_comparison};

struct LinearResiduals<'a> {
    curve: &'a RateCurve,
}

impl Residuals for LinearResiduals<'_> {
    fn residuals(&self, x: &[f64]) -> Vec<f64> {
        self.curve
            .times()
            .iter()
            .zip(self.curve.rates())
            .map(|(&t, &y)| comparison(t, x[0], x[1]) - y)
            .collect()
    }

    fn jacobian(&self, x: &[f64]) -> DMatrix<f64> {
        let times = self.curve.times();
        let mut jac = DMatrix::zeros(times.len(), 2);
        for (i, &t) in times.iter().enumerate() {
            let row = comparison_jacobian_row(t, x[0], x[1]);
            jac[(i, 0)] = row[0];
            jac[(i, 1)] = row[1];
        }
        jac
    }
}

fn try_fit(curve: &RateCurve, config: &AnalysisConfig) -> Result<ComparisonFit, FitError> {
    if curve.len() < config.min_fit_points {
        return Err(FitError::InsufficientBins {
            found: curve.len(),
            required: config.min_fit_points,
        });
    }

    let k_bounds = config.comparison_k_bounds;
    let c_bounds = config.comparison_c_bounds;
    let x0 = [
        k_bounds.clamp(curve.rates()[0] * curve.times()[0]),
        c_bounds.clamp(config.comparison_c_init),
    ];
    let lm = LevenbergConfig {
        max_evaluations: config.max_evaluations,
        ..LevenbergConfig::default()
    };

    let fit = minimize_bounded(&LinearResiduals { curve }, &x0, &[k_bounds, c_bounds], &lm)?;
    let (k, c) = (fit.params[0], fit.params[1]);
    if !k.is_finite() || !c.is_finite() {
        return Err(FitError::NonFinite { what: "comparison parameters" });
    }

    let predicted = predict_comparison(curve.times(), k, c);
    let r_squared = r_squared_log(curve.rates(), &predicted);
    if !r_squared.is_finite() {
        return Err(FitError::NonFinite { what: "comparison r_squared" });
    }

    Ok(ComparisonFit { k, c, r_squared })
}

/// Fit `K / (c + t)`; `None` when the fit is not possible.
pub fn fit_original_omori(curve: &RateCurve, config: &AnalysisConfig) -> Option<ComparisonFit> {
    match try_fit(curve, config) {
        Ok(fit) => {
            debug!(k = fit.k, c = fit.c, r_squared = fit.r_squared, "original omori fit");
            Some(fit)
        }
        Err(err) => {
            debug!(error = %err, "original omori fit skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::log_space;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_original_omori() {
        let times = log_space(0.2, 100.0, 20).unwrap();
        let rates = times.iter().map(|&t| comparison(t, 40.0, 0.3)).collect();
        let curve = RateCurve::new(times, rates).unwrap();

        let fit = fit_original_omori(&curve, &AnalysisConfig::default()).unwrap();
        assert_relative_eq!(fit.k, 40.0, max_relative = 1e-4);
        assert_relative_eq!(fit.c, 0.3, max_relative = 1e-3);
        assert!(fit.r_squared > 0.999);
    }

    #[test]
    fn short_curves_have_no_comparison() {
        let curve = RateCurve::new(vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 2.0, 1.3, 1.0]).unwrap();
        assert!(fit_original_omori(&curve, &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn flat_rates_give_zero_r_squared() {
        let curve = RateCurve::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![10.0; 5]).unwrap();
        let fit = fit_original_omori(&curve, &AnalysisConfig::default())
            .expect("flat curve should still fit");
        assert_eq!(fit.r_squared, 0.0);
        assert!(fit.c <= 10.0);
    }

    /// Steeper-than-`1/t` decay with deterministic scatter: the best `c` is
    /// its lower bound.
    fn steep_scattered_curve() -> RateCurve {
        let times = log_space(0.15, 700.0, 15).unwrap();
        let rates = times
            .iter()
            .enumerate()
            .map(|(i, &t)| 60.0 * (0.05 + t).powf(-1.3) * (1.0 + 0.2 * (2.3 * i as f64 + 0.7).sin()))
            .collect();
        RateCurve::new(times, rates).unwrap()
    }

    #[test]
    fn c_on_lower_bound_still_fits() {
        let cfg = AnalysisConfig::default();
        let fit = fit_original_omori(&steep_scattered_curve(), &cfg).expect("comparison fit");
        assert_relative_eq!(fit.c, cfg.comparison_c_bounds.lo);
        assert_relative_eq!(fit.k, 78.50, max_relative = 1e-3);
    }

    #[test]
    fn c_on_lower_bound_converges_quickly() {
        let cfg = AnalysisConfig::default();
        let curve = steep_scattered_curve();
        let x0 = [curve.rates()[0] * curve.times()[0], cfg.comparison_c_init];
        let fit = minimize_bounded(
            &LinearResiduals { curve: &curve },
            &x0,
            &[cfg.comparison_k_bounds, cfg.comparison_c_bounds],
            &LevenbergConfig::default(),
        )
        .unwrap();
        assert!(fit.evaluations < 100, "took {} evaluations", fit.evaluations);
    }

    #[test]
    fn tight_evaluation_cap_yields_none() {
        let times = log_space(0.2, 100.0, 20).unwrap();
        let rates = times.iter().map(|&t| comparison(t, 40.0, 0.3)).collect();
        let curve = RateCurve::new(times, rates).unwrap();
        let cfg = AnalysisConfig {
            max_evaluations: 1,
            ..AnalysisConfig::default()
        };
        assert!(fit_original_omori(&curve, &cfg).is_none());
    }
}
