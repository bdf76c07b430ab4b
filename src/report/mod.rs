//! Reporting utilities: batch summary statistics and formatted terminal output.

pub mod format;

pub use format::*;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::AnalysisRecord;
use crate::math::{mean, solve_least_squares, std_dev};

/// Decay exponent statistics over the good fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExponentStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Modified vs original Omori, over good fits that carry a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelComparison {
    pub n: usize,
    pub mean_original_r_squared: f64,
    pub std_original_r_squared: f64,
    pub mean_modified_r_squared: f64,
    pub std_modified_r_squared: f64,
}

/// Least-squares line `p = slope * magnitude + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub fitted: usize,
    /// Fitted sequences with `r_squared` above the threshold.
    pub good_fits: usize,
    pub good_fit_r_squared: f64,
    pub exponent: Option<ExponentStats>,
    pub mean_r_squared: Option<f64>,
    pub comparison: Option<ModelComparison>,
    pub magnitude_trend: Option<LinearTrend>,
}

/// Aggregate a batch of records.
///
/// Statistics are computed over good fits only and are `None` when there are none.
pub fn summarize(records: &[AnalysisRecord], good_fit_r_squared: f64) -> Summary {
    let good: Vec<&AnalysisRecord> = records
        .iter()
        .filter(|r| r.fit().is_some_and(|f| f.r_squared > good_fit_r_squared))
        .collect();

    let p_values: Vec<f64> = good.iter().filter_map(|r| r.fit()).map(|f| f.params.p).collect();
    let r2_values: Vec<f64> = good.iter().filter_map(|r| r.fit()).map(|f| f.r_squared).collect();

    let exponent = match (mean(&p_values), std_dev(&p_values)) {
        (Some(mean), Some(std)) => Some(ExponentStats {
            mean,
            std,
            min: p_values.iter().copied().fold(f64::INFINITY, f64::min),
            max: p_values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }),
        _ => None,
    };

    let (original, modified): (Vec<f64>, Vec<f64>) = good
        .iter()
        .filter_map(|r| Some((r.comparison()?.r_squared, r.fit()?.r_squared)))
        .unzip();
    let comparison = match (
        mean(&original),
        std_dev(&original),
        mean(&modified),
        std_dev(&modified),
    ) {
        (Some(mo), Some(so), Some(mm), Some(sm)) => Some(ModelComparison {
            n: original.len(),
            mean_original_r_squared: mo,
            std_original_r_squared: so,
            mean_modified_r_squared: mm,
            std_modified_r_squared: sm,
        }),
        _ => None,
    };

    let magnitudes: Vec<f64> = good.iter().map(|r| r.mainshock.magnitude).collect();

    Summary {
        total: records.len(),
        fitted: records.iter().filter(|r| r.fit_success()).count(),
        good_fits: good.len(),
        good_fit_r_squared,
        exponent,
        mean_r_squared: mean(&r2_values),
        comparison,
        magnitude_trend: linear_trend(&magnitudes, &p_values),
    }
}

/// Ordinary least-squares line through `(x, y)`; `None` without at least two distinct `x`.
pub fn linear_trend(x: &[f64], y: &[f64]) -> Option<LinearTrend> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let sxx: f64 = x.iter().map(|v| (v - mx) * (v - mx)).sum();
    if sxx == 0.0 {
        return None;
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let beta = solve_least_squares(&design, &DVector::from_column_slice(y))?;

    let syy: f64 = y.iter().map(|v| (v - my) * (v - my)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let r = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };

    Some(LinearTrend {
        slope: beta[1],
        intercept: beta[0],
        r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComparisonFit, FitOutcome, Mainshock, ModelFit, ModelParams, RateCurve};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn record(magnitude: f64, fit: Option<(f64, f64)>, original_r2: Option<f64>) -> AnalysisRecord {
        let mainshock = Mainshock {
            id: format!("m{magnitude}"),
            time: NaiveDate::from_ymd_opt(2019, 7, 6)
                .unwrap()
                .and_hms_opt(3, 19, 53)
                .unwrap(),
            magnitude,
            depth_km: 8.0,
            latitude: 35.77,
            longitude: -117.6,
            place: "Ridgecrest".to_string(),
        };
        let comparison = original_r2.map(|r_squared| ComparisonFit {
            k: 10.0,
            c: 0.1,
            r_squared,
        });
        let outcome = match fit {
            Some((p, r_squared)) => FitOutcome::Fit {
                fit: ModelFit {
                    params: ModelParams { k: 20.0, c: 0.1, p },
                    r_squared,
                    rmse: 1.0,
                },
                comparison,
                rate_curve: RateCurve::new(vec![1.0], vec![1.0]).unwrap(),
            },
            None => FitOutcome::Unfit {
                reason: "insufficient data".to_string(),
                rate_curve: None,
                comparison: None,
            },
        };
        AnalysisRecord {
            mainshock,
            total_aftershocks: 50,
            outcome,
        }
    }

    #[test]
    fn summary_counts_and_exponent_stats() {
        let records = vec![
            record(6.0, Some((1.0, 0.9)), Some(0.8)),
            record(7.0, Some((1.2, 0.7)), None),
            record(7.5, Some((2.5, 0.3)), Some(0.1)),
            record(6.5, None, None),
        ];
        let s = summarize(&records, 0.5);
        assert_eq!(s.total, 4);
        assert_eq!(s.fitted, 3);
        assert_eq!(s.good_fits, 2);

        let e = s.exponent.unwrap();
        assert_relative_eq!(e.mean, 1.1, epsilon = 1e-12);
        assert_relative_eq!(e.std, 0.1, epsilon = 1e-12);
        assert_eq!(e.min, 1.0);
        assert_eq!(e.max, 1.2);
        assert_relative_eq!(s.mean_r_squared.unwrap(), 0.8, epsilon = 1e-12);

        let c = s.comparison.unwrap();
        assert_eq!(c.n, 1);
        assert_relative_eq!(c.mean_original_r_squared, 0.8);
        assert_relative_eq!(c.mean_modified_r_squared, 0.9);
    }

    #[test]
    fn no_good_fits_means_no_statistics() {
        let records = vec![record(6.0, Some((1.0, 0.2)), None), record(6.5, None, None)];
        let s = summarize(&records, 0.5);
        assert_eq!(s.good_fits, 0);
        assert!(s.exponent.is_none());
        assert!(s.mean_r_squared.is_none());
        assert!(s.comparison.is_none());
        assert!(s.magnitude_trend.is_none());
    }

    #[test]
    fn linear_trend_recovers_exact_line() {
        let x = [6.0, 6.5, 7.0, 8.0];
        let y: Vec<f64> = x.iter().map(|m| 0.2 * m - 0.3).collect();
        let t = linear_trend(&x, &y).unwrap();
        assert_relative_eq!(t.slope, 0.2, epsilon = 1e-10);
        assert_relative_eq!(t.intercept, -0.3, epsilon = 1e-10);
        assert_relative_eq!(t.r, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn linear_trend_needs_spread_in_x() {
        assert!(linear_trend(&[7.0, 7.0], &[1.0, 1.2]).is_none());
        assert!(linear_trend(&[7.0], &[1.0]).is_none());
    }
}
