//! Data models for medscan.

pub mod annotation;
mod document;
mod entity;
mod report;

pub use annotation::AnnotateImageResponse;
pub(crate) use document::is_valid_confidence;
pub use document::{DocumentResult, InvalidResult, RawTextAnnotation, ResultFormat, TextBlock, Word};
pub use entity::{EntityMap, EntityType};
pub use report::{AnalysisReport, ConfidenceStats, EntitySummary, FailedItem};
