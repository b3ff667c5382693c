//! Normalized per-image OCR results.
//!
//! A `DocumentResult` is built once by the normalizer and never mutated
//! afterwards. Derived variants (`to_structured`, `with_source_path`) return
//! new values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::config::ConfigError;

/// Fidelity level controlling how much provider structure is retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat {
    /// Full text only, no blocks.
    TextOnly,
    /// Blocks with block-level confidence, no word detail.
    Structured,
    /// Blocks with words, plus the provider's flat text annotations.
    #[default]
    Full,
}

impl ResultFormat {
    pub const ALL: [ResultFormat; 3] = [Self::TextOnly, Self::Structured, Self::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextOnly => "text_only",
            Self::Structured => "structured",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "text_only" | "text" => Ok(Self::TextOnly),
            "structured" => Ok(Self::Structured),
            "full" => Ok(Self::Full),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

/// A single recognized word with its own confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub confidence: f32,
}

/// A spatial text unit within a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub confidence: f32,
    /// Populated only for `ResultFormat::Full`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            words: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.words = words;
        self
    }
}

/// Provider's flat text annotation, kept as a side channel in full results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTextAnnotation {
    pub description: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// One processed image.
///
/// Invariants: text-only results carry no blocks; failed results carry an
/// error, an empty text and no blocks. Deserialization checks them again, so
/// results read back from disk obey the same rules as freshly built ones.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "StoredResult")]
pub struct DocumentResult {
    source_path: String,
    succeeded: bool,
    error: Option<String>,
    captured_at: DateTime<Utc>,
    full_text: String,
    blocks: Vec<TextBlock>,
    format: ResultFormat,
    text_annotations: Vec<RawTextAnnotation>,
}

/// Whether `value` is a usable confidence score.
pub(crate) fn is_valid_confidence(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// A persisted result that breaks a `DocumentResult` invariant.
#[derive(Debug, Error)]
pub enum InvalidResult {
    #[error("successful result {0} carries an error")]
    SucceededWithError(String),

    #[error("failed result {0} has no error message")]
    MissingError(String),

    #[error("failed result {0} carries text, blocks or annotations")]
    FailedWithContent(String),

    #[error("{format} result {path} carries detail only kept for full results")]
    UnexpectedDetail { path: String, format: ResultFormat },

    #[error("text-only result {0} carries blocks")]
    TextOnlyWithBlocks(String),

    #[error("result {path} has {what} confidence {value} outside [0, 1]")]
    Confidence {
        path: String,
        what: &'static str,
        value: f32,
    },
}

/// Wire shape of a persisted result, checked before it becomes a
/// `DocumentResult`.
#[derive(Deserialize)]
struct StoredResult {
    #[serde(rename = "file_path", alias = "source_path")]
    source_path: String,
    #[serde(rename = "success", alias = "succeeded")]
    succeeded: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "timestamp", alias = "captured_at")]
    captured_at: DateTime<Utc>,
    #[serde(default)]
    full_text: String,
    #[serde(default, rename = "text_blocks", alias = "blocks")]
    blocks: Vec<TextBlock>,
    format: ResultFormat,
    #[serde(default)]
    text_annotations: Vec<RawTextAnnotation>,
}

impl TryFrom<StoredResult> for DocumentResult {
    type Error = InvalidResult;

    fn try_from(raw: StoredResult) -> Result<Self, Self::Error> {
        let path = raw.source_path.clone();
        let has_error = raw.error.as_deref().is_some_and(|e| !e.trim().is_empty());

        if raw.succeeded {
            if raw.error.is_some() {
                return Err(InvalidResult::SucceededWithError(path));
            }
        } else {
            if !has_error {
                return Err(InvalidResult::MissingError(path));
            }
            if !raw.full_text.is_empty()
                || !raw.blocks.is_empty()
                || !raw.text_annotations.is_empty()
            {
                return Err(InvalidResult::FailedWithContent(path));
            }
        }

        if raw.format == ResultFormat::TextOnly && !raw.blocks.is_empty() {
            return Err(InvalidResult::TextOnlyWithBlocks(path));
        }
        if raw.format != ResultFormat::Full
            && (!raw.text_annotations.is_empty() || raw.blocks.iter().any(|b| !b.words.is_empty()))
        {
            return Err(InvalidResult::UnexpectedDetail {
                path,
                format: raw.format,
            });
        }

        let confidences = raw
            .blocks
            .iter()
            .flat_map(|b| {
                std::iter::once(("block", b.confidence))
                    .chain(b.words.iter().map(|w| ("word", w.confidence)))
            })
            .chain(
                raw.text_annotations
                    .iter()
                    .filter_map(|a| a.confidence.map(|c| ("text annotation", c))),
            );
        for (what, value) in confidences {
            if !is_valid_confidence(value) {
                return Err(InvalidResult::Confidence { path, what, value });
            }
        }

        Ok(Self {
            source_path: raw.source_path,
            succeeded: raw.succeeded,
            error: raw.error,
            captured_at: raw.captured_at,
            full_text: raw.full_text,
            blocks: raw.blocks,
            format: raw.format,
            text_annotations: raw.text_annotations,
        })
    }
}

/// Persisted block: the block plus `num_words` for full results.
#[derive(Serialize)]
struct BlockRecord<'a> {
    #[serde(flatten)]
    block: &'a TextBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_words: Option<usize>,
}

/// Persisted result layout, with the derived counts consumers of the JSON
/// backup read (`text_length`, `num_blocks`).
#[derive(Serialize)]
struct ResultRecord<'a> {
    file_path: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    timestamp: DateTime<Utc>,
    full_text: &'a str,
    text_length: usize,
    text_blocks: Vec<BlockRecord<'a>>,
    num_blocks: usize,
    format: ResultFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_annotations: Option<&'a [RawTextAnnotation]>,
}

impl Serialize for DocumentResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let full = self.format == ResultFormat::Full;
        ResultRecord {
            file_path: &self.source_path,
            success: self.succeeded,
            error: self.error.as_deref(),
            timestamp: self.captured_at,
            full_text: &self.full_text,
            text_length: self.text_length(),
            text_blocks: self
                .blocks
                .iter()
                .map(|block| BlockRecord {
                    block,
                    num_words: full.then(|| block.words.len()),
                })
                .collect(),
            num_blocks: self.num_blocks(),
            format: self.format,
            text_annotations: (!self.text_annotations.is_empty())
                .then_some(self.text_annotations.as_slice()),
        }
        .serialize(serializer)
    }
}

impl DocumentResult {
    /// Build a successful result. Blocks are dropped for text-only results and
    /// text annotations are kept only for full results.
    pub fn success(
        source_path: impl Into<String>,
        format: ResultFormat,
        full_text: String,
        blocks: Vec<TextBlock>,
        text_annotations: Vec<RawTextAnnotation>,
    ) -> Self {
        let blocks = match format {
            ResultFormat::TextOnly => Vec::new(),
            _ => blocks,
        };
        let text_annotations = match format {
            ResultFormat::Full => text_annotations,
            _ => Vec::new(),
        };
        Self {
            source_path: source_path.into(),
            succeeded: true,
            error: None,
            captured_at: Utc::now(),
            full_text,
            blocks,
            format,
            text_annotations,
        }
    }

    /// Build a failed result carrying `error`.
    pub fn failure(
        source_path: impl Into<String>,
        format: ResultFormat,
        error: impl Into<String>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            source_path: source_path.into(),
            succeeded: false,
            error: Some(error),
            captured_at: Utc::now(),
            full_text: String::new(),
            blocks: Vec::new(),
            format,
            text_annotations: Vec::new(),
        }
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn format(&self) -> ResultFormat {
        self.format
    }

    pub fn text_annotations(&self) -> &[RawTextAnnotation] {
        &self.text_annotations
    }

    /// Length of the full text in characters.
    pub fn text_length(&self) -> usize {
        self.full_text.chars().count()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn num_words(&self) -> usize {
        self.blocks.iter().map(|b| b.words.len()).sum()
    }

    /// Structured-shape copy: word detail and text annotations dropped.
    ///
    /// Text-only results stay text-only since they never had blocks.
    pub fn to_structured(&self) -> Self {
        let format = match self.format {
            ResultFormat::TextOnly => ResultFormat::TextOnly,
            _ => ResultFormat::Structured,
        };
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|b| TextBlock::new(b.text.clone(), b.confidence))
                .collect(),
            text_annotations: Vec::new(),
            format,
            ..self.clone()
        }
    }

    /// Copy of this result pointing at a different source path (e.g. a
    /// storage URI assigned by a sink).
    pub fn with_source_path(&self, source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..self.clone()
        }
    }

    /// Compare everything except `captured_at`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.source_path == other.source_path
            && self.succeeded == other.succeeded
            && self.error == other.error
            && self.full_text == other.full_text
            && self.blocks == other.blocks
            && self.format == other.format
            && self.text_annotations == other.text_annotations
    }
}
