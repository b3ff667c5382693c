//! Domain entity types extracted from OCR text.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed vocabulary of entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PatientId,
    Date,
    Diagnosis,
    Medication,
    Dosage,
    LabValue,
    Phone,
    Email,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        Self::PatientId,
        Self::Date,
        Self::Diagnosis,
        Self::Medication,
        Self::Dosage,
        Self::LabValue,
        Self::Phone,
        Self::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientId => "patient_id",
            Self::Date => "date",
            Self::Diagnosis => "diagnosis",
            Self::Medication => "medication",
            Self::Dosage => "dosage",
            Self::LabValue => "lab_value",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity type → distinct values, in first-occurrence order.
///
/// Types without matches are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityMap(BTreeMap<EntityType, Vec<String>>);

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` under `entity_type` unless it is already there.
    pub fn insert(&mut self, entity_type: EntityType, value: String) -> bool {
        if self.contains(entity_type, &value) {
            return false;
        }
        self.0.entry(entity_type).or_default().push(value);
        true
    }

    pub fn get(&self, entity_type: EntityType) -> Option<&[String]> {
        self.0.get(&entity_type).map(|v| v.as_slice())
    }

    pub fn contains(&self, entity_type: EntityType, value: &str) -> bool {
        self.get(entity_type)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &[String])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}
