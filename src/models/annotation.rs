//! Raw recognition-provider response for a single image.
//!
//! Mirrors the document-text-detection payload as a read-only tree of plain
//! records: pages → blocks → paragraphs → words → symbols. Every field the
//! provider may leave out is either an explicit `Option` or defaults to empty.
//! Both the snake_case and the provider's camelCase field names are accepted.

use serde::{Deserialize, Serialize};

/// Status object the provider attaches when annotation failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
}

/// One annotate-image response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotateImageResponse {
    /// Provider status, present when the request failed.
    #[serde(default)]
    pub error: Option<ProviderStatus>,
    /// Flattened error message (alternative to `error.message`).
    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(default, alias = "fullTextAnnotation")]
    pub full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default, alias = "textAnnotations")]
    pub text_annotations: Vec<EntityAnnotation>,
}

impl AnnotateImageResponse {
    /// Non-empty provider error message, if the response reports one.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                self.error
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .filter(|m| !m.trim().is_empty())
            })
    }
}

/// Hierarchical OCR output for the whole image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    /// Block-level confidence; the provider omits it when it is zero.
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub words: Vec<AnnotatedWord>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedWord {
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl AnnotatedWord {
    /// Word text assembled from its symbols.
    pub fn text(&self) -> String {
        self.symbols.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Entry of the provider's flat text annotation list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub locale: Option<String>,
}
