//! Service layer for medscan.
//!
//! Pure OCR-result processing: normalization, entity extraction, confidence
//! statistics, batching and reporting. I/O lives behind the collaborators in
//! `fetch` and `crate::storage`.

pub mod batch;
pub mod confidence;
pub mod entities;
pub mod fetch;
pub mod normalize;
pub mod report;
pub mod text;

pub use batch::{BatchConfig, BatchError, BatchProcessor};
pub use confidence::{confidence_stats, LOW_CONFIDENCE_THRESHOLD};
pub use entities::{extract_entities, EntityExtractor};
pub use fetch::{AnnotationFetcher, FetchError, RetryingFetcher, SidecarFetcher};
pub use normalize::AnnotationNormalizer;
pub use report::{build_report, ReportBuilder};
pub use text::{clean_text, detect_language, LanguageInfo};
