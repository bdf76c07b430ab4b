//! Formatted terminal output.

use crate::domain::{AnalysisRecord, ModelKind};
use crate::report::Summary;

const RULE: &str = "============================================================";

/// Truncate to at most `max` characters (not bytes).
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One progress block per sequence, e.g.
///
/// ```text
/// [3/40] M7.8 - Pazarcik earthquake, Kahram...
///     K=52.13, c=0.094, p=1.08, R²=0.962
/// ```
pub fn format_record_line(index: usize, total: usize, record: &AnalysisRecord) -> String {
    let header = format!(
        "[{}/{}] M{:.1} - {}...",
        index + 1,
        total,
        record.mainshock.magnitude,
        truncate(&record.mainshock.place, 30)
    );
    let detail = match record.fit() {
        Some(fit) => format!(
            "    K={:.2}, c={:.3}, p={:.2}, R²={:.3}",
            fit.params.k, fit.params.c, fit.params.p, fit.r_squared
        ),
        None => format!(
            "    Fitting failed ({})",
            record.failure_reason().unwrap_or("unknown reason")
        ),
    };
    format!("{header}\n{detail}")
}

/// Closing summary block.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("\nANALYSIS SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Total sequences analyzed: {}\n", summary.total));
    out.push_str(&format!("Fitted sequences: {}\n", summary.fitted));
    out.push_str(&format!(
        "Successful fits (R² > {}): {}\n",
        summary.good_fit_r_squared, summary.good_fits
    ));

    if let Some(e) = &summary.exponent {
        out.push_str(&format!("\nOmori-Utsu parameters (n={}):\n", summary.good_fits));
        out.push_str(&format!("  p (decay exponent): {:.2} ± {:.2}\n", e.mean, e.std));
        out.push_str(&format!("  p range: [{:.2}, {:.2}]\n", e.min, e.max));
    }
    if let Some(r2) = summary.mean_r_squared {
        out.push_str(&format!("  Average R²: {r2:.3}\n"));
    }

    if let Some(c) = &summary.comparison {
        out.push_str(&format!("\nModel comparison (n={}):\n", c.n));
        out.push_str(&format!(
            "  {:<26} R² = {:.3} ± {:.3}\n",
            ModelKind::OriginalOmori.display_name(),
            c.mean_original_r_squared,
            c.std_original_r_squared
        ));
        out.push_str(&format!(
            "  {:<26} R² = {:.3} ± {:.3}\n",
            ModelKind::ModifiedOmori.display_name(),
            c.mean_modified_r_squared,
            c.std_modified_r_squared
        ));
    }

    if let Some(t) = &summary.magnitude_trend {
        out.push_str(&format!(
            "\np vs mainshock magnitude: slope={:.3}, intercept={:.3}, r={:.2}\n",
            t.slope, t.intercept, t.r
        ));
    }

    if let Some(e) = &summary.exponent {
        out.push_str(&format!(
            "\nComparison to literature:\n  mean p = {:.2} vs. typical p ≈ 1.0-1.3\n",
            e.mean
        ));
    }

    out
}
