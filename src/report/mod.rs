//! Report output.
//!
//! Serializes normalized results to CSV files and prints the per-model
//! sentiment distribution to stdout. The CSV column order is the field
//! order of [`NormalizedResult`].

use crate::models::{NormalizedResult, RunReport, SummaryReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Path of the per-model CSV file for a given output stem.
pub fn model_csv_path(stem: &str, model_id: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.csv", stem, model_id))
}

/// Path of the combined CSV file holding every model's rows.
pub fn combined_csv_path(stem: &str) -> PathBuf {
    PathBuf::from(format!("{}_all.csv", stem))
}

/// Writes result rows to a CSV file with a header row.
pub fn write_csv(path: &Path, rows: &[NormalizedResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write CSV row to {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV file: {}", path.display()))?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Prints the per-model label distribution and run bookkeeping to stdout.
pub fn print_summary(summaries: &[SummaryReport], run: &RunReport) {
    println!("\n📊 Sentiment distribution (%):");

    for summary in summaries {
        println!("\n   Model: {} ({} results)", summary.model_id, summary.total);
        if summary.percentages.is_empty() {
            println!("   (no results)");
            continue;
        }
        for (sentiment, pct) in &summary.percentages {
            println!("   {:<8} {:>6.2}%", sentiment.as_str(), pct);
        }
    }

    if !run.failed_models.is_empty() {
        println!("\n⚠️  Models that failed to load:");
        for (model_id, error) in &run.failed_models {
            println!("   {} — {}", model_id, error);
        }
    }

    println!(
        "\n   Run started: {} | PRs: {} | Comments per model: {} | Duration: {:.1}s",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        run.pull_requests,
        run.comments,
        run.duration_seconds
    );
}
