//! Batch analysis report types.
//!
//! `AnalysisReport` is derived from a batch of results and holds no identity.
//! It serializes to the persisted report layout:
//! `summary`, `text_metrics`, `entities_found`, `failed_documents`.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::entity::EntityType;

/// Aggregate confidence over a set of text blocks. All zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceStats {
    pub average: f32,
    pub min: f32,
    pub max: f32,
    /// Blocks with confidence strictly below the low-confidence threshold.
    pub low_confidence_count: usize,
    pub total_blocks: usize,
}

/// Frequency summary for one entity type across a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySummary {
    /// Total occurrences, duplicates across documents included.
    pub count: usize,
    /// Distinct values across the batch.
    pub unique_count: usize,
    /// Most frequent values, descending, ties in first-seen order.
    pub top_5: Vec<(String, usize)>,
}

/// A failed document and its error.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub source_path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of successful results, 0 for an empty batch.
    pub success_rate: f64,
    pub confidence: ConfidenceStats,
    pub entities: BTreeMap<EntityType, EntitySummary>,
    pub failed_items: Vec<FailedItem>,
}

impl AnalysisReport {
    pub fn to_json_value(&self) -> serde_json::Value {
        // Serialization of this type cannot fail: all keys are strings.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct Summary<'a>(&'a AnalysisReport);

impl Serialize for Summary<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Summary", 4)?;
        s.serialize_field("total_documents", &self.0.total)?;
        s.serialize_field("successful", &self.0.successful)?;
        s.serialize_field("failed", &self.0.failed)?;
        s.serialize_field("success_rate", &self.0.success_rate)?;
        s.end()
    }
}

struct TextMetrics<'a>(&'a ConfidenceStats);

impl Serialize for TextMetrics<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TextMetrics", 3)?;
        s.serialize_field("total_text_blocks", &self.0.total_blocks)?;
        s.serialize_field("average_confidence", &self.0.average)?;
        s.serialize_field("blocks_processed", &self.0.total_blocks)?;
        s.end()
    }
}

impl Serialize for EntitySummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("EntitySummary", 3)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("unique_count", &self.unique_count)?;
        s.serialize_field("top_entries", &self.top_5)?;
        s.end()
    }
}

impl Serialize for FailedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FailedItem", 2)?;
        s.serialize_field("file", &self.source_path)?;
        s.serialize_field("error", &self.error)?;
        s.end()
    }
}

impl Serialize for AnalysisReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AnalysisReport", 4)?;
        s.serialize_field("summary", &Summary(self))?;
        s.serialize_field("text_metrics", &TextMetrics(&self.confidence))?;
        s.serialize_field("entities_found", &self.entities)?;
        s.serialize_field("failed_documents", &self.failed_items)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_shape() {
        let mut entities = BTreeMap::new();
        entities.insert(
            EntityType::Date,
            EntitySummary {
                count: 3,
                unique_count: 2,
                top_5: vec![("01/02/2024".to_string(), 2), ("2024-03-04".to_string(), 1)],
            },
        );
        let report = AnalysisReport {
            total: 2,
            successful: 1,
            failed: 1,
            success_rate: 50.0,
            confidence: ConfidenceStats {
                average: 0.5,
                min: 0.5,
                max: 0.5,
                low_confidence_count: 1,
                total_blocks: 1,
            },
            entities,
            failed_items: vec![FailedItem {
                source_path: "b.jpg".to_string(),
                error: "boom".to_string(),
            }],
        };

        let value = report.to_json_value();
        assert_eq!(value["summary"]["total_documents"], 2);
        assert_eq!(value["summary"]["success_rate"], 50.0);
        assert_eq!(value["text_metrics"]["total_text_blocks"], 1);
        assert_eq!(value["text_metrics"]["blocks_processed"], 1);
        assert_eq!(value["text_metrics"]["average_confidence"], 0.5);
        assert_eq!(value["entities_found"]["date"]["count"], 3);
        assert_eq!(
            value["entities_found"]["date"]["top_entries"][0],
            serde_json::json!(["01/02/2024", 2])
        );
        assert_eq!(value["failed_documents"][0]["file"], "b.jpg");
        assert_eq!(value["failed_documents"][0]["error"], "boom");
    }
}
