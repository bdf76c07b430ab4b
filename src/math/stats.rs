//! Goodness-of-fit and descriptive statistics.

/// Additive floor inside `log10` so zero-ish predictions stay finite.
pub const LOG_FLOOR: f64 = 1e-10;

/// `log10(x + LOG_FLOOR)`.
pub fn log10_floored(x: f64) -> f64 {
    (x + LOG_FLOOR).log10()
}

/// Coefficient of determination computed on `log10` values.
///
/// `1 - SS_res / SS_tot`, with `SS_tot` taken around the mean of the observed
/// log-rates. When the observed log-rates have no spread the statistic is
/// defined as `0.0`.
pub fn r_squared_log(observed: &[f64], predicted: &[f64]) -> f64 {
    let log_obs: Vec<f64> = observed.iter().map(|&v| log10_floored(v)).collect();
    let log_pred: Vec<f64> = predicted.iter().map(|&v| log10_floored(v)).collect();

    let Some(m) = mean(&log_obs) else {
        return 0.0;
    };

    let (lo, hi) = log_obs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let ss_tot: f64 = log_obs.iter().map(|v| (v - m) * (v - m)).sum();
    if ss_tot == 0.0 || hi == lo {
        return 0.0;
    }

    let ss_res: f64 = log_obs
        .iter()
        .zip(log_pred.iter())
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    1.0 - ss_res / ss_tot
}

/// Root-mean-square error in the original (linear) scale.
pub fn rmse(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let sse: f64 = observed
        .iter()
        .zip(predicted.iter())
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    (sse / n as f64).sqrt()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_prediction_has_unit_r_squared() {
        let obs = [100.0, 10.0, 1.0, 0.1];
        assert_relative_eq!(r_squared_log(&obs, &obs), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn identical_rates_give_zero_r_squared() {
        let obs = [3.7, 3.7, 3.7, 3.7, 3.7];
        let pred = [1.0, 2.0, 3.0, 4.0, 5.0];
        let r2 = r_squared_log(&obs, &pred);
        assert_eq!(r2, 0.0);
        assert!(!r2.is_nan());
    }

    #[test]
    fn r_squared_is_measured_in_log_space() {
        // Off by a constant factor of 10 everywhere: one decade of residual per point.
        let obs = [1000.0, 100.0, 10.0];
        let pred = [10000.0, 1000.0, 100.0];
        // log obs = 3, 2, 1 -> SS_tot = 2; SS_res = 3.
        assert_relative_eq!(r_squared_log(&obs, &pred), 1.0 - 3.0 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn rmse_is_measured_in_linear_space() {
        let obs = [10.0, 20.0];
        let pred = [13.0, 16.0];
        assert_relative_eq!(rmse(&obs, &pred), (12.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn descriptive_stats() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_relative_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 2.0);
    }
}
