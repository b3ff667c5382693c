//! Rebuild a report from saved results.

use std::path::Path;

use crate::cli::icons::success;
use crate::services::build_report;
use crate::storage::{load_results, write_report};

pub async fn cmd_report(results_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let results = load_results(results_path)?;
    let report = build_report(&results);

    match output {
        Some(path) => {
            write_report(path, &report)?;
            eprintln!(
                "{} Report for {} results written to {}",
                success(),
                results.len(),
                path.display()
            );
        }
        None => println!("{}", report.to_json_pretty()?),
    }

    Ok(())
}
