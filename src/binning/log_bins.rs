use tracing::warn;

use crate::domain::{AnalysisConfig, RateCurve};
use crate::error::FitError;
use crate::math::log_space;

/// Turn raw elapsed times into a log-binned rate curve.
///
/// Steps:
/// 1. drop non-finite / negative times and sort the rest
/// 2. clamp the lower edge to `max(config.min_time, min(times))`
/// 3. `bins = min(max_bins, len / events_per_bin)` log-spaced bins up to `max(times)`
/// 4. `rate = count / width`, `center = (lo + hi) / 2`, empty bins dropped
///
/// Bins are `[lo, hi)` except the last, which also includes `hi`. Times below
/// the clamped lower edge fall outside every bin.
pub fn bin_rates(times: &[f64], config: &AnalysisConfig) -> Result<RateCurve, FitError> {
    let mut sorted: Vec<f64> = times
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .collect();
    let dropped = times.len() - sorted.len();
    if dropped > 0 {
        warn!(dropped, "ignoring non-finite or negative elapsed times");
    }

    if sorted.is_empty() || sorted.len() < config.min_events {
        return Err(FitError::InsufficientEvents {
            found: sorted.len(),
            required: config.min_events.max(1),
        });
    }

    sorted.sort_by(f64::total_cmp);

    let t_min = config.min_time.max(sorted[0]);
    let t_max = sorted[sorted.len() - 1];

    let n_bins = config
        .max_bins
        .min(sorted.len() / config.events_per_bin.max(1));
    if n_bins < 1 || t_max <= t_min {
        return Err(FitError::InsufficientBins {
            found: 0,
            required: config.min_fit_points,
        });
    }

    let edges = log_space(t_min, t_max, n_bins + 1)?;
    let counts = histogram(&sorted, &edges);

    let mut centers = Vec::with_capacity(n_bins);
    let mut rates = Vec::with_capacity(n_bins);
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let (lo, hi) = (edges[i], edges[i + 1]);
        centers.push((lo + hi) / 2.0);
        rates.push(count as f64 / (hi - lo));
    }

    RateCurve::new(centers, rates)
}

/// Count sorted values per bin. The final bin is closed on the right.
fn histogram(sorted: &[f64], edges: &[f64]) -> Vec<usize> {
    let last = edges.len() - 1;
    (0..last)
        .map(|i| {
            let start = sorted.partition_point(|&v| v < edges[i]);
            let end = if i + 1 == last {
                sorted.partition_point(|&v| v <= edges[i + 1])
            } else {
                sorted.partition_point(|&v| v < edges[i + 1])
            };
            end - start
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn evenly_spread(n: usize, lo: f64, hi: f64) -> Vec<f64> {
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n as f64 - 1.0))
            .collect()
    }

    #[test]
    fn fewer_than_twenty_events_is_insufficient() {
        let cfg = AnalysisConfig::default();
        let err = bin_rates(&evenly_spread(19, 1.0, 50.0), &cfg).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientEvents {
                found: 19,
                required: 20
            }
        );
    }

    #[test]
    fn empty_input_is_insufficient_even_without_a_floor() {
        let cfg = AnalysisConfig {
            min_events: 0,
            ..AnalysisConfig::default()
        };
        assert_eq!(
            bin_rates(&[], &cfg).unwrap_err(),
            FitError::InsufficientEvents {
                found: 0,
                required: 1
            }
        );
        assert!(matches!(
            bin_rates(&[f64::NAN, -1.0], &cfg),
            Err(FitError::InsufficientEvents { found: 0, .. })
        ));
    }

    #[test]
    fn histogram_last_bin_is_closed() {
        let edges = [1.0, 2.0, 4.0];
        let counts = histogram(&[0.5, 1.0, 1.5, 2.0, 3.9, 4.0, 4.1], &edges);
        assert_eq!(counts, vec![2, 3]);
    }

    #[test]
    fn every_event_is_counted_once() {
        let cfg = AnalysisConfig::default();
        let times = evenly_spread(60, 0.5, 120.0);
        let curve = bin_rates(&times, &cfg).unwrap();

        // Recover counts from rate * width; the log grid is rebuilt the same way.
        let edges = log_space(0.5, 120.0, 21).unwrap();
        let mut total = 0.0;
        let mut k = 0;
        for w in edges.windows(2) {
            let center = (w[0] + w[1]) / 2.0;
            if k < curve.len() && (curve.times()[k] - center).abs() < 1e-12 {
                total += curve.rates()[k] * (w[1] - w[0]);
                k += 1;
            }
        }
        assert_eq!(k, curve.len());
        assert_relative_eq!(total, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let cfg = AnalysisConfig::default();
        let mut times = evenly_spread(30, 1.0, 100.0);
        let expected = bin_rates(&times, &cfg).unwrap();
        times.reverse();
        assert_eq!(bin_rates(&times, &cfg).unwrap(), expected);
    }

    #[test]
    fn zero_times_are_clamped_to_the_minimum() {
        let cfg = AnalysisConfig::default();
        let mut times = vec![0.0; 5];
        times.extend(evenly_spread(20, 1.0, 100.0));
        let curve = bin_rates(&times, &cfg).unwrap();
        // Lower edge is 0.1; events at t = 0 fall outside every bin.
        assert!(curve.times()[0] > 0.1);
    }

    #[test]
    fn bin_count_is_capped() {
        let cfg = AnalysisConfig::default();
        let times = evenly_spread(500, 0.1, 1000.0);
        let curve = bin_rates(&times, &cfg).unwrap();
        assert!(curve.len() <= cfg.max_bins);
    }

    #[test]
    fn degenerate_span_has_no_bins() {
        let cfg = AnalysisConfig::default();
        let times = vec![5.0; 25];
        assert!(matches!(
            bin_rates(&times, &cfg),
            Err(FitError::InsufficientBins { .. })
        ));
    }

    #[test]
    fn non_finite_times_are_dropped_before_the_floor() {
        let cfg = AnalysisConfig::default();
        let mut times = evenly_spread(19, 1.0, 50.0);
        times.push(f64::NAN);
        times.push(-3.0);
        assert!(matches!(
            bin_rates(&times, &cfg),
            Err(FitError::InsufficientEvents { found: 19, .. })
        ));
    }
}
