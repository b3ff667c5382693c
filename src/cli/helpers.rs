//! Shared helper functions for CLI commands.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::icons::{dim_arrow, error, success, warn};
use crate::models::{AnalysisReport, EntityMap};
use crate::services::LOW_CONFIDENCE_THRESHOLD;

/// Progress bar used while processing images.
pub fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// File name of a source path, for compact output.
pub fn display_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

/// Print a report summary to stdout.
pub fn print_report(report: &AnalysisReport) {
    let status = if report.failed == 0 { success() } else { warn() };
    println!(
        "{} Processed {} images: {} succeeded, {} failed ({:.1}%)",
        status,
        report.total,
        style(report.successful).green(),
        style(report.failed).red(),
        report.success_rate
    );

    let stats = &report.confidence;
    if stats.total_blocks > 0 {
        println!(
            "  {} Confidence: avg {:.3}, min {:.3}, max {:.3} over {} blocks",
            dim_arrow(),
            stats.average,
            stats.min,
            stats.max,
            stats.total_blocks
        );
        if stats.low_confidence_count > 0 {
            println!(
                "  {} {} blocks below {:.1}",
                warn(),
                stats.low_confidence_count,
                LOW_CONFIDENCE_THRESHOLD
            );
        }
    }

    if !report.entities.is_empty() {
        println!("\n{}", style("Entities").bold());
        for (entity_type, summary) in &report.entities {
            println!(
                "  {:<12} {} found, {} unique",
                style(entity_type).cyan(),
                summary.count,
                summary.unique_count
            );
            for (value, count) in &summary.top_5 {
                println!("    {} {} ({})", dim_arrow(), value, count);
            }
        }
    }

    if !report.failed_items.is_empty() {
        println!("\n{}", style("Failed").bold());
        for item in &report.failed_items {
            println!("  {} {}: {}", error(), display_name(&item.source_path), item.error);
        }
    }
}

/// Print entities from a single document.
pub fn print_entities(entities: &EntityMap) {
    if entities.is_empty() {
        println!("  {} No entities found", dim_arrow());
        return;
    }
    for (entity_type, values) in entities.iter() {
        println!("  {:<12} {}", style(entity_type).cyan(), values.join(", "));
    }
}
