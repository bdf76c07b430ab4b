//! Catalog JSON ingest.
//!
//! The collector writes `{"sequences": [{"mainshock": {...}, "aftershocks": [...]}, ...]}`
//! alongside other bookkeeping keys, which are ignored here. A malformed file is
//! an input error (exit code 2); per-sequence problems are left to the analyzer.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::Catalog;
use crate::error::AppError;

/// Parse catalog JSON from a string.
pub fn parse_catalog(json: &str) -> Result<Catalog, AppError> {
    let catalog: Catalog =
        serde_json::from_str(json).map_err(|e| AppError::new(2, format!("Invalid catalog JSON: {e}")))?;

    for seq in &catalog.sequences {
        if seq.aftershocks.is_empty() {
            warn!(mainshock = %seq.mainshock.id, "sequence has no aftershocks");
        }
    }
    Ok(catalog)
}

/// Read and parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read catalog '{}': {e}", path.display())))?;
    let catalog = parse_catalog(&text)?;
    info!(
        path = %path.display(),
        sequences = catalog.sequences.len(),
        "loaded catalog"
    );
    Ok(catalog)
}

/// Write a catalog as pretty JSON (used by the synthetic generator).
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<(), AppError> {
    let file = fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create catalog '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, catalog)
        .map_err(|e| AppError::new(2, format!("Failed to write catalog JSON: {e}")))?;
    Ok(())
}
