//! Batch processing command.

use std::path::{Path, PathBuf};

use console::style;
use serde_json::json;

use crate::cli::helpers::{display_name, print_report, progress_bar};
use crate::cli::icons::{error, success, warn};
use crate::config::Config;
use crate::models::ResultFormat;
use crate::services::{
    build_report, detect_language, AnnotationFetcher, AnnotationNormalizer, BatchError,
    BatchProcessor, RetryingFetcher, SidecarFetcher,
};
use crate::storage::{list_images, list_user_images, JsonFileSink, ResultSink};

/// Command-line overrides for `process`.
pub struct ProcessOptions {
    /// Treat the directory as a storage root holding `{uid}/images/`.
    pub user: Option<String>,
    pub subfolder: Option<String>,
    pub responses: Option<PathBuf>,
    pub max_items: Option<usize>,
    pub fail_fast: bool,
    pub format: Option<ResultFormat>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

pub async fn cmd_process(config: &Config, dir: &Path, options: ProcessOptions) -> anyhow::Result<()> {
    let profile = config.active_profile()?;
    let mut batch_config = config.batch_config()?;
    if options.max_items.is_some() {
        batch_config.max_items = options.max_items;
    }
    batch_config.fail_fast |= options.fail_fast;

    let format = options.format.unwrap_or(profile.result_format);
    let processor = BatchProcessor::new(batch_config)?;
    let normalizer = AnnotationNormalizer::new(format);

    let mut fetcher = SidecarFetcher::new();
    if let Some(responses) = options.responses.as_ref().or(config.responses_dir.as_ref()) {
        fetcher = fetcher.with_responses_dir(responses);
    }
    let fetcher = RetryingFetcher::from_config(fetcher, &config.errors);
    tracing::debug!("Using {} annotation fetcher", fetcher.name());

    let images = match &options.user {
        Some(uid) => list_user_images(dir, uid, options.subfolder.as_deref()),
        None => list_images(dir),
    }
    .map_err(|e| anyhow::anyhow!("Cannot list images in {}: {}", dir.display(), e))?;
    if images.is_empty() {
        eprintln!("{} No images found in {}", warn(), dir.display());
        return Ok(());
    }

    let selected = processor.selected(&images).len();
    if !options.json {
        eprintln!(
            "{} Processing {} images with profile {} ({})",
            style("→").cyan(),
            selected,
            style(&profile.name).bold(),
            format
        );
    }

    let pb = progress_bar(selected)?;
    if options.json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    // Fetching may sleep between retries; keep it off the async workers.
    let worker_pb = pb.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        processor.process_observed(&images, &fetcher, &normalizer, |result| {
            worker_pb.set_message(display_name(result.source_path()));
            worker_pb.inc(1);
        })
    })
    .await?;
    pb.finish_and_clear();

    let results = match outcome {
        Ok(results) => results,
        Err(BatchError::Aborted { source_path, error: message }) => {
            eprintln!("{} Aborted at {}: {}", error(), source_path, message);
            anyhow::bail!("batch aborted (fail-fast)");
        }
        Err(e) => return Err(e.into()),
    };

    let expected = profile.language_hints.join(", ");
    for result in results.iter().filter(|r| r.succeeded()) {
        let language = detect_language(result.full_text());
        if language.likely_mixed_language {
            tracing::info!(
                "{} looks like mixed-language text ({:.1}% non-ASCII, expected {})",
                result.source_path(),
                language.non_ascii_percentage,
                expected
            );
        }
    }

    let report = build_report(&results);

    let backup = &config.output.json_backup;
    let saved = if backup.enabled || options.output.is_some() {
        let mut sink = JsonFileSink::new(backup, config.profile.clone());
        if let Some(output) = &options.output {
            sink = sink.with_output_dir(output);
        }
        if let Some(uid) = &options.user {
            sink = sink.for_user(uid);
        }
        Some(sink.write(&results, &report)?)
    } else {
        None
    };

    if options.json {
        let payload = json!({
            "results": results,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for result in &results {
        if result.succeeded() {
            println!(
                "  {} {} {}",
                success(),
                display_name(result.source_path()),
                style(format!(
                    "({} chars, {} blocks)",
                    result.text_length(),
                    result.num_blocks()
                ))
                .dim()
            );
        } else {
            println!(
                "  {} {} {}",
                error(),
                display_name(result.source_path()),
                style(result.error().unwrap_or("unknown error")).red()
            );
        }
    }
    println!();
    print_report(&report);

    if let Some(path) = saved {
        println!("\n{} Results saved to {}", success(), path.display());
    }

    Ok(())
}
