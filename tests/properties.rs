//! Property-based tests for the rate model and the temporal binner.

use omori_fit::binning::bin_rates;
use omori_fit::domain::AnalysisConfig;
use omori_fit::error::FitError;
use omori_fit::math::r_squared_log;
use omori_fit::models::{comparison, primary};
use proptest::prelude::*;

/// Strictly increasing positive times built from positive gaps.
fn increasing_times(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..50.0, len).prop_map(|gaps| {
        gaps.iter()
            .scan(0.0, |acc, g| {
                *acc += g;
                Some(*acc)
            })
            .collect()
    })
}

// ============================================================================
// Rate model
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn primary_is_positive_and_non_increasing(
        t in 0.0..1e4f64,
        dt in 0.0..1e3f64,
        k in 1e-3..1e6f64,
        c in 1e-3..10.0f64,
        p in 0.01..3.0f64,
    ) {
        let now = primary(t, k, c, p);
        let later = primary(t + dt, k, c, p);
        prop_assert!(now > 0.0 && later > 0.0);
        prop_assert!(later <= now * (1.0 + 1e-12), "rate rose from {} to {}", now, later);
    }

    #[test]
    fn comparison_is_primary_with_unit_exponent(
        t in 0.0..1e4f64,
        k in 1e-3..1e6f64,
        c in 1e-3..10.0f64,
    ) {
        let a = comparison(t, k, c);
        let b = primary(t, k, c, 1.0);
        prop_assert!((a - b).abs() <= 1e-12 * a.abs().max(b.abs()));
    }
}

// ============================================================================
// Binner
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn binned_curve_is_increasing_and_positive(times in increasing_times(20..300)) {
        let curve = bin_rates(&times, &AnalysisConfig::default()).unwrap();
        prop_assert!(!curve.is_empty());
        prop_assert!(curve.len() <= 30);
        prop_assert!(curve.times().windows(2).all(|w| w[0] < w[1]));
        prop_assert!(curve.rates().iter().all(|&r| r > 0.0 && r.is_finite()));
    }

    #[test]
    fn short_sequences_are_insufficient(times in increasing_times(0..20)) {
        let n = times.len();
        let result = bin_rates(&times, &AnalysisConfig::default());
        prop_assert_eq!(result, Err(FitError::InsufficientEvents { found: n, required: 20 }));
    }

    #[test]
    fn constant_rates_have_zero_r_squared(
        rate in 1e-3..1e3f64,
        n in 2usize..40,
        predicted in prop::collection::vec(1e-3..1e3f64, 40),
    ) {
        let observed = vec![rate; n];
        let r2 = r_squared_log(&observed, &predicted[..n]);
        prop_assert_eq!(r2, 0.0);
    }
}
