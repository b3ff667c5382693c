//! Medical entity extraction from OCR text.
//!
//! A fixed table of named, case-insensitive regex rules is evaluated
//! independently over the whole text. When a rule has capture groups the
//! value is the last group that took part in the match, so label prefixes
//! such as "Patient ID:" are dropped; rules without groups use the whole
//! match.

use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};

use crate::models::{EntityMap, EntityType};

/// One named extraction rule.
pub struct EntityRule {
    pub entity_type: EntityType,
    pub pattern: Regex,
}

impl EntityRule {
    fn new(entity_type: EntityType, pattern: &str) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("entity pattern should compile");
        Self {
            entity_type,
            pattern,
        }
    }

    /// Extracted value for one match.
    fn value(caps: &Captures<'_>) -> Option<String> {
        let m = if caps.len() > 1 {
            (1..caps.len()).rev().find_map(|i| caps.get(i))?
        } else {
            caps.get(0)?
        };
        let value = m.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

static RULES: LazyLock<Vec<EntityRule>> = LazyLock::new(|| {
    vec![
        // "Patient ID: ABC-123", "MRN 0042", "Medical Record No. 55-1"
        EntityRule::new(
            EntityType::PatientId,
            r"\b(patient\s*id\b|mrn\b|medical\s*record(?:\s*(?:number|no\.?|#))?)\s*[:=#]?\s*([A-Z0-9][A-Z0-9\-]*)",
        ),
        // 01/15/2024, 1/5/24, 2024-01-15
        EntityRule::new(
            EntityType::Date,
            r"\b(\d{1,2}/\d{1,2}/\d{2,4}|\d{4}-\d{2}-\d{2})\b",
        ),
        EntityRule::new(
            EntityType::Diagnosis,
            r"\b(diagnosis|assessment)\s*[:=]?\s*([^.\n]+\.?)",
        ),
        EntityRule::new(
            EntityType::Medication,
            r"\b(medications?|drug|rx)\b\s*[:=]?\s*([^,\n]+)",
        ),
        EntityRule::new(
            EntityType::Dosage,
            r"\b(\d+(?:\.\d+)?\s*(?:mcg|mg|ml|g|iu|units?|tablets?|capsules?))\b",
        ),
        // "Glucose: 95 mg/dL", "HbA1c 6.5"
        EntityRule::new(
            EntityType::LabValue,
            r"\b([a-z][a-z0-9]*\s*[:=]?\s*\d+(?:\.\d+)?(?:\s*(?:mg/dl|mmol/l|g/dl|mg|ml|dl|mmol|g|units?)\b)?)",
        ),
        // (555) 123-4567, +1 555 123 4567, 555.123.4567
        EntityRule::new(
            EntityType::Phone,
            r"((?:\+?1[\s\-.]?)?\(?\b\d{3}\)?[\s\-.]?\d{3}[\s\-.]?\d{4})\b",
        ),
        EntityRule::new(
            EntityType::Email,
            r"\b([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})\b",
        ),
    ]
});

/// The built-in rule table.
pub fn rules() -> &'static [EntityRule] {
    &RULES
}

/// Regex-driven entity extractor over a fixed rule table.
pub struct EntityExtractor {
    rules: &'static [EntityRule],
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self { rules: rules() }
    }

    /// Extract entities from `text`. Pure and deterministic.
    pub fn extract(&self, text: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        for rule in self.rules {
            for caps in rule.pattern.captures_iter(text) {
                if let Some(value) = EntityRule::value(&caps) {
                    entities.insert(rule.entity_type, value);
                }
            }
        }
        entities
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract entities with the built-in rules.
pub fn extract_entities(text: &str) -> EntityMap {
    EntityExtractor::new().extract(text)
}
