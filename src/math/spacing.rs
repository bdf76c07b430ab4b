//! Log-spaced grids.

use crate::error::FitError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
///
/// The endpoints are returned exactly as given so that histogram edges cover
/// the full data range.
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(FitError::NonFinite { what: "log-spaced range" });
    }
    if steps < 2 {
        return Err(FitError::InsufficientBins {
            found: steps.saturating_sub(1),
            required: 1,
        });
    }

    let log_min = min.log10();
    let log_max = max.log10();
    let step = (log_max - log_min) / (steps as f64 - 1.0);

    let mut out: Vec<f64> = (0..steps)
        .map(|i| 10f64.powf(log_min + step * i as f64))
        .collect();
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert_eq!(v[0], 0.1);
        assert_eq!(v[v.len() - 1], 10.0);
        assert!((v[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn log_space_has_constant_ratio() {
        let v = log_space(0.5, 500.0, 7).unwrap();
        let ratio = v[1] / v[0];
        for w in v.windows(2) {
            assert!((w[1] / w[0] - ratio).abs() < 1e-9);
        }
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 4).is_err());
        assert!(log_space(2.0, 1.0, 4).is_err());
        assert!(log_space(1.0, 1.0, 4).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }
}
