//! Shared domain types.
//!
//! Lightweight serializable types that are:
//!
//! - loaded from the collector's catalog JSON
//! - used in-memory during binning and fitting
//! - exported to JSON/CSV for the presentation layer

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Lower clamp applied to the earliest elapsed time before log-spaced binning.
///
/// Expressed in the unit selected by [`TimeUnit`] (hours by default).
pub const MIN_ELAPSED_TIME: f64 = 0.1;

/// Which elapsed-time column drives the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hours,
    Days,
}

impl TimeUnit {
    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }
}

/// Concrete fitted model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Omori-Utsu law `K / (c + t)^p`.
    ModifiedOmori,
    /// Omori's 1894 law `K / (c + t)`, i.e. `p` fixed at 1.
    OriginalOmori,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::ModifiedOmori => "Modified Omori (p fitted)",
            ModelKind::OriginalOmori => "Original Omori (p=1)",
        }
    }
}

/// The reference event that defines elapsed-time zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mainshock {
    pub id: String,
    /// Reference instant (UTC, no offset in the collector's format).
    pub time: NaiveDateTime,
    pub magnitude: f64,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub place: String,
}

/// A single event following the mainshock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aftershock {
    pub hours_after_mainshock: f64,
    pub days_after_mainshock: f64,
    #[serde(default)]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place: Option<String>,
}

impl Aftershock {
    /// Elapsed time since the mainshock in the requested unit.
    pub fn elapsed(&self, unit: TimeUnit) -> f64 {
        match unit {
            TimeUnit::Hours => self.hours_after_mainshock,
            TimeUnit::Days => self.days_after_mainshock,
        }
    }
}

/// One mainshock and its aftershocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub mainshock: Mainshock,
    #[serde(default)]
    pub aftershocks: Vec<Aftershock>,
}

impl Sequence {
    /// Elapsed times of every aftershock, in input order.
    pub fn elapsed_times(&self, unit: TimeUnit) -> Vec<f64> {
        self.aftershocks.iter().map(|a| a.elapsed(unit)).collect()
    }
}

/// The full input collection handed over by the collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

/// Observed event rates at bin-center times.
///
/// Invariants (checked by [`RateCurve::new`]):
/// - `times.len() == rates.len()`
/// - times strictly positive and strictly increasing
/// - rates finite and strictly positive (empty bins are never stored)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateCurve {
    times: Vec<f64>,
    rates: Vec<f64>,
}

impl RateCurve {
    pub fn new(times: Vec<f64>, rates: Vec<f64>) -> Result<Self, FitError> {
        if times.len() != rates.len() {
            return Err(FitError::InvalidRateCurve("times and rates differ in length"));
        }
        if times.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(FitError::InvalidRateCurve("times must be finite and > 0"));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FitError::InvalidRateCurve("times must be strictly increasing"));
        }
        if rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(FitError::InvalidRateCurve("rates must be finite and > 0"));
        }
        Ok(Self { times, rates })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl<'de> Deserialize<'de> for RateCurve {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            times: Vec<f64>,
            rates: Vec<f64>,
        }
        let raw = Raw::deserialize(deserializer)?;
        RateCurve::new(raw.times, raw.rates).map_err(serde::de::Error::custom)
    }
}

/// Inclusive `[lo, hi]` parameter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lo: f64,
    pub hi: f64,
}

impl Bounds {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lo, self.hi)
    }
}

/// Omori-Utsu parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(rename = "K")]
    pub k: f64,
    pub c: f64,
    pub p: f64,
}

impl ModelParams {
    pub fn as_array(&self) -> [f64; 3] {
        [self.k, self.c, self.p]
    }
}

/// Successful primary fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelFit {
    pub params: ModelParams,
    /// Coefficient of determination over `log10` rates.
    pub r_squared: f64,
    /// Root-mean-square error in linear rate units.
    pub rmse: f64,
}

/// Successful comparison fit (`p` fixed at 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonFit {
    #[serde(rename = "K")]
    pub k: f64,
    pub c: f64,
    pub r_squared: f64,
}

/// Outcome of analysing one sequence.
///
/// Consumers only need to branch on the variant: a `Fit` always carries the
/// full parameter set, an `Unfit` never does.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Unfit {
        reason: String,
        /// Present when binning succeeded but the primary fit did not.
        rate_curve: Option<RateCurve>,
        comparison: Option<ComparisonFit>,
    },
    Fit {
        fit: ModelFit,
        comparison: Option<ComparisonFit>,
        rate_curve: RateCurve,
    },
}

/// Result record for one sequence: created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AnalysisRow", try_from = "AnalysisRow")]
pub struct AnalysisRecord {
    pub mainshock: Mainshock,
    pub total_aftershocks: usize,
    pub outcome: FitOutcome,
}

impl AnalysisRecord {
    pub fn fit_success(&self) -> bool {
        matches!(self.outcome, FitOutcome::Fit { .. })
    }

    pub fn fit(&self) -> Option<&ModelFit> {
        match &self.outcome {
            FitOutcome::Fit { fit, .. } => Some(fit),
            FitOutcome::Unfit { .. } => None,
        }
    }

    pub fn comparison(&self) -> Option<&ComparisonFit> {
        match &self.outcome {
            FitOutcome::Fit { comparison, .. } | FitOutcome::Unfit { comparison, .. } => {
                comparison.as_ref()
            }
        }
    }

    pub fn rate_curve(&self) -> Option<&RateCurve> {
        match &self.outcome {
            FitOutcome::Fit { rate_curve, .. } => Some(rate_curve),
            FitOutcome::Unfit { rate_curve, .. } => rate_curve.as_ref(),
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            FitOutcome::Unfit { reason, .. } => Some(reason),
            FitOutcome::Fit { .. } => None,
        }
    }
}

/// Flat wire form of [`AnalysisRecord`], matching the presentation layer's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnalysisRow {
    mainshock_id: String,
    mainshock_magnitude: f64,
    mainshock_depth: f64,
    mainshock_lat: f64,
    mainshock_lon: f64,
    mainshock_place: String,
    mainshock_time: NaiveDateTime,
    total_aftershocks: usize,
    fit_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t_data: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate_data: Option<Vec<f64>>,
    #[serde(rename = "K", default, skip_serializing_if = "Option::is_none")]
    k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r_squared: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rmse: Option<f64>,
    #[serde(rename = "original_K", default, skip_serializing_if = "Option::is_none")]
    original_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_r_squared: Option<f64>,
}

impl From<AnalysisRecord> for AnalysisRow {
    fn from(record: AnalysisRecord) -> Self {
        let AnalysisRecord {
            mainshock,
            total_aftershocks,
            outcome,
        } = record;

        let mut row = AnalysisRow {
            mainshock_id: mainshock.id,
            mainshock_magnitude: mainshock.magnitude,
            mainshock_depth: mainshock.depth_km,
            mainshock_lat: mainshock.latitude,
            mainshock_lon: mainshock.longitude,
            mainshock_place: mainshock.place,
            mainshock_time: mainshock.time,
            total_aftershocks,
            fit_success: false,
            failure_reason: None,
            t_data: None,
            rate_data: None,
            k: None,
            c: None,
            p: None,
            r_squared: None,
            rmse: None,
            original_k: None,
            original_c: None,
            original_r_squared: None,
        };

        let (curve, comparison) = match outcome {
            FitOutcome::Unfit {
                reason,
                rate_curve,
                comparison,
            } => {
                row.failure_reason = Some(reason);
                (rate_curve, comparison)
            }
            FitOutcome::Fit {
                fit,
                comparison,
                rate_curve,
            } => {
                row.fit_success = true;
                row.k = Some(fit.params.k);
                row.c = Some(fit.params.c);
                row.p = Some(fit.params.p);
                row.r_squared = Some(fit.r_squared);
                row.rmse = Some(fit.rmse);
                (Some(rate_curve), comparison)
            }
        };

        if let Some(curve) = curve {
            row.t_data = Some(curve.times);
            row.rate_data = Some(curve.rates);
        }
        if let Some(cmp) = comparison {
            row.original_k = Some(cmp.k);
            row.original_c = Some(cmp.c);
            row.original_r_squared = Some(cmp.r_squared);
        }
        row
    }
}

impl TryFrom<AnalysisRow> for AnalysisRecord {
    type Error = String;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        let rate_curve = match (row.t_data, row.rate_data) {
            (Some(times), Some(rates)) => Some(RateCurve::new(times, rates).map_err(|e| e.to_string())?),
            (None, None) => None,
            _ => return Err("t_data and rate_data must appear together".to_string()),
        };
        let comparison = match (row.original_k, row.original_c, row.original_r_squared) {
            (Some(k), Some(c), Some(r_squared)) => Some(ComparisonFit { k, c, r_squared }),
            _ => None,
        };

        let outcome = if row.fit_success {
            let missing = |name: &str| format!("fit_success=true record is missing '{name}'");
            let params = ModelParams {
                k: row.k.ok_or_else(|| missing("K"))?,
                c: row.c.ok_or_else(|| missing("c"))?,
                p: row.p.ok_or_else(|| missing("p"))?,
            };
            FitOutcome::Fit {
                fit: ModelFit {
                    params,
                    r_squared: row.r_squared.ok_or_else(|| missing("r_squared"))?,
                    rmse: row.rmse.ok_or_else(|| missing("rmse"))?,
                },
                comparison,
                rate_curve: rate_curve.ok_or_else(|| missing("t_data"))?,
            }
        } else {
            FitOutcome::Unfit {
                reason: row.failure_reason.unwrap_or_default(),
                rate_curve,
                comparison,
            }
        };

        Ok(AnalysisRecord {
            mainshock: Mainshock {
                id: row.mainshock_id,
                time: row.mainshock_time,
                magnitude: row.mainshock_magnitude,
                depth_km: row.mainshock_depth,
                latitude: row.mainshock_lat,
                longitude: row.mainshock_lon,
                place: row.mainshock_place,
            },
            total_aftershocks: row.total_aftershocks,
            outcome,
        })
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// `Default` reproduces the reference constants; the CLI overrides a subset.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub time_unit: TimeUnit,

    /// Minimum raw events before a sequence is binned at all.
    pub min_events: usize,
    /// Upper limit on the number of log-spaced bins.
    pub max_bins: usize,
    /// Target events per bin (`bins = min(max_bins, n / events_per_bin)`).
    pub events_per_bin: usize,
    /// Clamp for the earliest elapsed time (see [`MIN_ELAPSED_TIME`]).
    pub min_time: f64,
    /// Minimum non-empty bins before either fit is attempted.
    pub min_fit_points: usize,

    pub k_bounds: Bounds,
    pub c_bounds: Bounds,
    pub p_bounds: Bounds,
    pub c_init: f64,
    pub p_init: f64,
    /// Iteration cap for the primary (quasi-Newton) fit.
    pub max_iter: u64,

    pub comparison_k_bounds: Bounds,
    pub comparison_c_bounds: Bounds,
    pub comparison_c_init: f64,
    /// Evaluation cap for the comparison (least-squares) fit.
    pub max_evaluations: usize,

    /// Fits with `r_squared` above this count as good in summaries.
    pub good_fit_r_squared: f64,
    /// Analyse sequences on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Hours,
            min_events: 20,
            max_bins: 30,
            events_per_bin: 3,
            min_time: MIN_ELAPSED_TIME,
            min_fit_points: 5,
            k_bounds: Bounds::new(0.01, 1e6),
            c_bounds: Bounds::new(0.001, 10.0),
            p_bounds: Bounds::new(0.1, 3.0),
            c_init: 0.1,
            p_init: 1.0,
            max_iter: 1000,
            comparison_k_bounds: Bounds::new(0.0, 1e6),
            comparison_c_bounds: Bounds::new(0.001, 10.0),
            comparison_c_init: 0.1,
            max_evaluations: 5000,
            good_fit_r_squared: 0.5,
            parallel: true,
        }
    }
}
