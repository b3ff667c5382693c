//! Inspect a single provider response.

use std::path::Path;

use console::style;
use serde_json::json;

use crate::cli::helpers::print_entities;
use crate::cli::icons::{dim_arrow, error, success, warn};
use crate::config::Config;
use crate::models::ResultFormat;
use crate::services::{
    clean_text, confidence_stats, detect_language, extract_entities, AnnotationNormalizer,
    LOW_CONFIDENCE_THRESHOLD,
};

pub async fn cmd_inspect(
    config: &Config,
    file: &Path,
    format: Option<ResultFormat>,
    clean: bool,
    json: bool,
) -> anyhow::Result<()> {
    let format = match format {
        Some(format) => format,
        None => config.active_profile()?.result_format,
    };
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?;

    let source = file.to_string_lossy();
    let result = AnnotationNormalizer::new(format).normalize_json(&contents, &source);
    let text = if clean {
        clean_text(result.full_text())
    } else {
        result.full_text().to_string()
    };
    let entities = extract_entities(&text);
    let stats = confidence_stats(result.blocks());
    let language = detect_language(&text);

    if json {
        let payload = json!({
            "result": result,
            "entities": entities,
            "language": language,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if !result.succeeded() {
        println!(
            "{} {}: {}",
            error(),
            file.display(),
            result.error().unwrap_or("unknown error")
        );
        return Ok(());
    }

    println!(
        "{} {} ({}, {} chars, {} blocks, {} words)",
        success(),
        file.display(),
        result.format(),
        result.text_length(),
        result.num_blocks(),
        result.num_words()
    );

    println!("\n{}", style("Text").bold());
    for line in text.lines() {
        println!("  {}", line);
    }

    if !result.blocks().is_empty() {
        println!("\n{}", style("Blocks").bold());
        for block in result.blocks() {
            let confidence = format!("{:.2}", block.confidence);
            let confidence = if block.confidence < LOW_CONFIDENCE_THRESHOLD {
                style(confidence).yellow()
            } else {
                style(confidence).green()
            };
            println!("  [{}] {}", confidence, block.text);
        }
        println!(
            "  {} avg {:.3}, {} of {} below threshold",
            dim_arrow(),
            stats.average,
            stats.low_confidence_count,
            stats.total_blocks
        );
    }

    println!("\n{}", style("Entities").bold());
    print_entities(&entities);

    if language.likely_mixed_language {
        println!(
            "\n{} Possibly mixed-language text ({:.1}% non-ASCII)",
            warn(),
            language.non_ascii_percentage
        );
    }

    Ok(())
}
