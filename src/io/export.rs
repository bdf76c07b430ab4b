//! Export analysis records.
//!
//! - JSON: the full record list in the presentation layer's flat schema
//!   (including the binned rate curve for plotting)
//! - CSV: one row per sequence with parameters and scores only

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::AnalysisRecord;
use crate::error::AppError;

/// Write records as a pretty-printed JSON array.
pub fn write_records_json(path: &Path, records: &[AnalysisRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, records)
        .map_err(|e| AppError::new(2, format!("Failed to write results JSON: {e}")))?;
    Ok(())
}

/// Read records previously written by [`write_records_json`].
pub fn read_records_json(path: &Path) -> Result<Vec<AnalysisRecord>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open results JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid results JSON: {e}")))
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    mainshock_id: &'a str,
    mainshock_magnitude: f64,
    mainshock_time: String,
    mainshock_place: &'a str,
    total_aftershocks: usize,
    n_bins: Option<usize>,
    fit_success: bool,
    failure_reason: Option<&'a str>,
    #[serde(rename = "K")]
    k: Option<f64>,
    c: Option<f64>,
    p: Option<f64>,
    r_squared: Option<f64>,
    rmse: Option<f64>,
    #[serde(rename = "original_K")]
    original_k: Option<f64>,
    original_c: Option<f64>,
    original_r_squared: Option<f64>,
}

impl<'a> From<&'a AnalysisRecord> for SummaryRow<'a> {
    fn from(r: &'a AnalysisRecord) -> Self {
        let fit = r.fit();
        let cmp = r.comparison();
        Self {
            mainshock_id: &r.mainshock.id,
            mainshock_magnitude: r.mainshock.magnitude,
            mainshock_time: r.mainshock.time.to_string(),
            mainshock_place: &r.mainshock.place,
            total_aftershocks: r.total_aftershocks,
            n_bins: r.rate_curve().map(|c| c.len()),
            fit_success: r.fit_success(),
            failure_reason: r.failure_reason(),
            k: fit.map(|f| f.params.k),
            c: fit.map(|f| f.params.c),
            p: fit.map(|f| f.params.p),
            r_squared: fit.map(|f| f.r_squared),
            rmse: fit.map(|f| f.rmse),
            original_k: cmp.map(|f| f.k),
            original_c: cmp.map(|f| f.c),
            original_r_squared: cmp.map(|f| f.r_squared),
        }
    }
}

/// Write one flat CSV row per record. Missing values are empty cells.
pub fn write_summary_csv(path: &Path, records: &[AnalysisRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary CSV '{}': {e}", path.display())))?;
    for record in records {
        writer
            .serialize(SummaryRow::from(record))
            .map_err(|e| AppError::new(2, format!("Failed to write summary CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush summary CSV: {e}")))?;
    Ok(())
}
