//! Annotation normalizer: raw provider response → `DocumentResult`.
//!
//! Never returns an error. Provider errors and malformed payloads become
//! failed results carrying the message.

use thiserror::Error;

use crate::models::annotation::{AnnotateImageResponse, Block, FullTextAnnotation};
use crate::models::{
    is_valid_confidence, DocumentResult, RawTextAnnotation, ResultFormat, TextBlock, Word,
};

/// Faults caught while normalizing one response.
#[derive(Debug, Error)]
enum NormalizeError {
    #[error("{0}")]
    Provider(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Converts provider responses into results at a fixed fidelity level.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationNormalizer {
    format: ResultFormat,
}

impl AnnotationNormalizer {
    pub fn new(format: ResultFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ResultFormat {
        self.format
    }

    /// Normalize a parsed response.
    pub fn normalize(&self, response: &AnnotateImageResponse, source_path: &str) -> DocumentResult {
        match self.try_normalize(response, source_path) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Normalization failed for {}: {}", source_path, e);
                DocumentResult::failure(source_path, self.format, e.to_string())
            }
        }
    }

    /// Normalize a response still in its JSON wire form.
    pub fn normalize_json(&self, raw: &str, source_path: &str) -> DocumentResult {
        match serde_json::from_str::<AnnotateImageResponse>(raw) {
            Ok(response) => self.normalize(&response, source_path),
            Err(e) => DocumentResult::failure(
                source_path,
                self.format,
                NormalizeError::Malformed(e.to_string()).to_string(),
            ),
        }
    }

    fn try_normalize(
        &self,
        response: &AnnotateImageResponse,
        source_path: &str,
    ) -> Result<DocumentResult, NormalizeError> {
        if let Some(message) = response.error_message() {
            return Err(NormalizeError::Provider(message.to_string()));
        }

        let annotation = response.full_text_annotation.as_ref();
        let full_text = annotation.map(|a| a.text.clone()).unwrap_or_default();

        let (blocks, text_annotations) = match self.format {
            ResultFormat::TextOnly => (Vec::new(), Vec::new()),
            ResultFormat::Structured => (collect_blocks(annotation, false)?, Vec::new()),
            ResultFormat::Full => (
                collect_blocks(annotation, true)?,
                collect_text_annotations(response)?,
            ),
        };

        Ok(DocumentResult::success(
            source_path,
            self.format,
            full_text,
            blocks,
            text_annotations,
        ))
    }
}

/// Walk pages → blocks → paragraphs → words → symbols.
fn collect_blocks(
    annotation: Option<&FullTextAnnotation>,
    keep_words: bool,
) -> Result<Vec<TextBlock>, NormalizeError> {
    let Some(annotation) = annotation else {
        return Ok(Vec::new());
    };

    let mut blocks = Vec::new();
    for page in &annotation.pages {
        for block in &page.blocks {
            blocks.push(build_block(block, keep_words)?);
        }
    }
    Ok(blocks)
}

fn build_block(block: &Block, keep_words: bool) -> Result<TextBlock, NormalizeError> {
    let mut text = String::new();
    let mut words = Vec::new();

    for paragraph in &block.paragraphs {
        for word in &paragraph.words {
            let word_text = word.text();
            text.push_str(&word_text);
            text.push(' ');
            if keep_words {
                words.push(Word {
                    text: word_text,
                    confidence: check_confidence(word.confidence, "word")?,
                });
            }
        }
    }

    let confidence = check_confidence(block.confidence, "block")?;
    Ok(TextBlock::new(text.trim(), confidence).with_words(words))
}

fn collect_text_annotations(
    response: &AnnotateImageResponse,
) -> Result<Vec<RawTextAnnotation>, NormalizeError> {
    response
        .text_annotations
        .iter()
        .map(|a| {
            let confidence = match a.confidence {
                Some(c) => Some(check_confidence(Some(c), "text annotation")?),
                None => None,
            };
            Ok(RawTextAnnotation {
                description: a.description.clone(),
                confidence,
            })
        })
        .collect()
}

/// Missing confidence reads as 0.0; anything outside [0, 1] is malformed.
fn check_confidence(value: Option<f32>, what: &str) -> Result<f32, NormalizeError> {
    let value = value.unwrap_or(0.0);
    if is_valid_confidence(value) {
        Ok(value)
    } else {
        Err(NormalizeError::Malformed(format!(
            "{} confidence {} outside [0, 1]",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "fullTextAnnotation": {
            "text": "Patient ID: ABC-123\nRx: Lisinopril 10 mg\n",
            "pages": [{"blocks": [
                {"confidence": 0.97, "paragraphs": [{"words": [
                    {"confidence": 0.99, "symbols": [{"text": "Patient"}]},
                    {"confidence": 0.98, "symbols": [{"text": "I"}, {"text": "D"}, {"text": ":"}]},
                    {"confidence": 0.95, "symbols": [{"text": "ABC-123"}]}
                ]}]},
                {"confidence": 0.72, "paragraphs": [
                    {"words": [{"confidence": 0.7, "symbols": [{"text": "Rx:"}]}]},
                    {"words": [
                        {"confidence": 0.8, "symbols": [{"text": "Lisinopril"}]},
                        {"confidence": 0.6, "symbols": [{"text": "10"}]},
                        {"confidence": 0.75, "symbols": [{"text": "mg"}]}
                    ]}
                ]}
            ]}]
        },
        "textAnnotations": [
            {"description": "Patient ID: ABC-123\nRx: Lisinopril 10 mg", "locale": "en"},
            {"description": "Patient", "confidence": 0.99}
        ]
    }"#;

    fn sample() -> AnnotateImageResponse {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_text_only() {
        let result = AnnotationNormalizer::new(ResultFormat::TextOnly).normalize(&sample(), "a.jpg");
        assert!(result.succeeded());
        assert_eq!(result.format(), ResultFormat::TextOnly);
        assert!(result.full_text().starts_with("Patient ID"));
        assert!(result.blocks().is_empty());
        assert!(result.text_annotations().is_empty());
    }

    #[test]
    fn test_structured_blocks() {
        let result =
            AnnotationNormalizer::new(ResultFormat::Structured).normalize(&sample(), "a.jpg");
        assert_eq!(result.num_blocks(), 2);
        assert_eq!(result.blocks()[0].text, "Patient ID: ABC-123");
        assert_eq!(result.blocks()[0].confidence, 0.97);
        assert_eq!(result.blocks()[1].text, "Rx: Lisinopril 10 mg");
        assert!(result.blocks().iter().all(|b| b.words.is_empty()));
        assert!(result.text_annotations().is_empty());
    }

    #[test]
    fn test_full_keeps_words_and_annotations() {
        let result = AnnotationNormalizer::new(ResultFormat::Full).normalize(&sample(), "a.jpg");
        assert_eq!(result.num_words(), 7);
        assert_eq!(result.blocks()[0].words[1].text, "ID:");
        assert_eq!(result.blocks()[1].words[2].confidence, 0.6);
        assert_eq!(result.text_annotations().len(), 2);
        assert_eq!(result.text_annotations()[0].confidence, None);
        assert_eq!(result.text_annotations()[1].confidence, Some(0.99));
    }

    #[test]
    fn test_full_reduces_to_structured() {
        let response = sample();
        let full = AnnotationNormalizer::new(ResultFormat::Full).normalize(&response, "a.jpg");
        let structured =
            AnnotationNormalizer::new(ResultFormat::Structured).normalize(&response, "a.jpg");
        assert!(full.to_structured().same_content(&structured));
    }

    #[test]
    fn test_missing_annotation_is_success() {
        let response = AnnotateImageResponse::default();
        for format in ResultFormat::ALL {
            let result = AnnotationNormalizer::new(format).normalize(&response, "blank.png");
            assert!(result.succeeded());
            assert_eq!(result.full_text(), "");
            assert!(result.blocks().is_empty());
            assert!(result.error().is_none());
        }
    }

    #[test]
    fn test_provider_error() {
        let response: AnnotateImageResponse =
            serde_json::from_str(r#"{"error": {"code": 3, "message": "Bad image data."}}"#)
                .unwrap();
        let result = AnnotationNormalizer::new(ResultFormat::Full).normalize(&response, "x.jpg");
        assert!(!result.succeeded());
        assert_eq!(result.error(), Some("Bad image data."));
        assert!(result.full_text().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let result = AnnotationNormalizer::new(ResultFormat::Structured)
            .normalize_json("{not json", "x.jpg");
        assert!(!result.succeeded());
        assert!(result.error().unwrap().starts_with("Malformed response"));
    }

    #[test]
    fn test_out_of_range_confidence() {
        let raw = r#"{"fullTextAnnotation": {"text": "a", "pages": [{"blocks": [
            {"confidence": 1.7, "paragraphs": []}
        ]}]}}"#;
        let result = AnnotationNormalizer::new(ResultFormat::Structured).normalize_json(raw, "x");
        assert!(!result.succeeded());
        assert!(result.error().unwrap().contains("outside [0, 1]"));

        // Text-only never looks at blocks.
        let text_only = AnnotationNormalizer::new(ResultFormat::TextOnly).normalize_json(raw, "x");
        assert!(text_only.succeeded());
    }
}
