//! Batch analysis report.
//!
//! Reports are recomputed from their inputs on every call; nothing is cached.

use std::collections::{BTreeMap, HashMap};

use super::confidence::stats_from_values;
use super::entities::EntityExtractor;
use crate::models::{AnalysisReport, DocumentResult, EntityMap, EntitySummary, EntityType, FailedItem};

/// Number of entries kept in each entity type's frequency list.
pub const TOP_ENTRIES: usize = 5;

/// Builds `AnalysisReport`s from finished batches.
#[derive(Default)]
pub struct ReportBuilder {
    extractor: EntityExtractor,
}

impl ReportBuilder {
    /// Build a report, extracting entities from each successful result.
    pub fn build(&self, results: &[DocumentResult]) -> AnalysisReport {
        let entities: Vec<EntityMap> = results
            .iter()
            .filter(|r| r.succeeded())
            .map(|r| self.extractor.extract(r.full_text()))
            .collect();
        build_with_entities(results, &entities)
    }
}

/// Build a report with the built-in entity rules.
pub fn build_report(results: &[DocumentResult]) -> AnalysisReport {
    ReportBuilder::default().build(results)
}

/// Build a report from results and entities already extracted from the
/// successful ones, in result order.
pub fn build_with_entities(results: &[DocumentResult], entities: &[EntityMap]) -> AnalysisReport {
    let total = results.len();
    let (ok, failed): (Vec<&DocumentResult>, Vec<&DocumentResult>) =
        results.iter().partition(|r| r.succeeded());

    let confidence = stats_from_values(
        ok.iter()
            .flat_map(|r| r.blocks().iter().map(|b| b.confidence)),
    );

    let mut merged: BTreeMap<EntityType, Vec<String>> = BTreeMap::new();
    for map in entities {
        for (entity_type, values) in map.iter() {
            merged
                .entry(entity_type)
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    let entities = merged
        .into_iter()
        .map(|(entity_type, values)| {
            let top = top_entries(&values, usize::MAX);
            let summary = EntitySummary {
                count: values.len(),
                unique_count: top.len(),
                top_5: top.into_iter().take(TOP_ENTRIES).collect(),
            };
            (entity_type, summary)
        })
        .collect();

    let success_rate = if total == 0 {
        0.0
    } else {
        ok.len() as f64 / total as f64 * 100.0
    };

    AnalysisReport {
        total,
        successful: ok.len(),
        failed: failed.len(),
        success_rate,
        confidence,
        entities,
        failed_items: failed
            .iter()
            .map(|r| FailedItem {
                source_path: r.source_path().to_string(),
                error: r.error().unwrap_or("unknown error").to_string(),
            })
            .collect(),
    }
}

/// Up to `n` most frequent values, descending by count. Ties keep the order
/// in which values were first seen.
pub fn top_entries(values: &[String], n: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for value in values {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }

    // sort_by is stable, so first-seen order survives ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}
