//! Batch processing over many source images.
//!
//! Sources are processed strictly in order, one at a time. Chunking by
//! `batch_size` only groups progress logging; it never changes results.

use thiserror::Error;

use super::fetch::{AnnotationFetcher, FetchError};
use super::normalize::AnnotationNormalizer;
use crate::config::ConfigError;
use crate::models::{DocumentResult, ResultFormat};

/// Errors that end a batch early.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Processing aborted at {source_path}: {error}")]
    Aborted { source_path: String, error: String },
}

/// Batch settings derived from the active profile and error policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// `None` or `Some(0)` processes every source.
    pub max_items: Option<usize>,
    pub fail_fast: bool,
    pub log_errors: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_items: None,
            fail_fast: false,
            log_errors: true,
        }
    }
}

impl BatchConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(self)
    }

    /// Effective item limit, if any.
    fn limit(&self) -> Option<usize> {
        self.max_items.filter(|n| *n > 0)
    }
}

/// Drives fetch + normalize over a list of sources.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Sources that a run over `sources` would actually touch.
    pub fn selected<'a>(&self, sources: &'a [String]) -> &'a [String] {
        match self.config.limit() {
            Some(limit) if limit < sources.len() => {
                tracing::info!("Limiting processing to {} of {} images", limit, sources.len());
                &sources[..limit]
            }
            _ => sources,
        }
    }

    /// Fetch and normalize each source with the given collaborators.
    pub fn process(
        &self,
        sources: &[String],
        fetcher: &dyn AnnotationFetcher,
        normalizer: &AnnotationNormalizer,
    ) -> Result<Vec<DocumentResult>, BatchError> {
        self.process_observed(sources, fetcher, normalizer, |_| {})
    }

    /// Like `process`, calling `on_result` after each item is normalized.
    pub fn process_observed<O>(
        &self,
        sources: &[String],
        fetcher: &dyn AnnotationFetcher,
        normalizer: &AnnotationNormalizer,
        mut on_result: O,
    ) -> Result<Vec<DocumentResult>, BatchError>
    where
        O: FnMut(&DocumentResult),
    {
        let format = normalizer.format();
        self.process_with(sources, format, |source| {
            let result = match fetcher.fetch(source) {
                Ok(response) => normalizer.normalize(&response, source),
                Err(e) => DocumentResult::failure(source, format, e.to_string()),
            };
            on_result(&result);
            Ok(result)
        })
    }

    /// Run `f` over each selected source.
    ///
    /// Fail-open (default): an `Err` from `f` becomes a failed result in
    /// `format` and processing continues. Fail-fast: the first `Err` or failed result
    /// aborts the batch and nothing after it is attempted.
    pub fn process_with<F>(
        &self,
        sources: &[String],
        format: ResultFormat,
        mut f: F,
    ) -> Result<Vec<DocumentResult>, BatchError>
    where
        F: FnMut(&str) -> Result<DocumentResult, FetchError>,
    {
        let selected = self.selected(sources);
        let mut results = Vec::with_capacity(selected.len());
        if selected.is_empty() {
            return Ok(results);
        }

        let total_batches = selected.len().div_ceil(self.config.batch_size);
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for (index, chunk) in selected.chunks(self.config.batch_size).enumerate() {
            tracing::info!(
                "Processing batch {}/{}: {} images",
                index + 1,
                total_batches,
                chunk.len()
            );

            for source in chunk {
                let result = match f(source) {
                    Ok(result) => result,
                    Err(e) => {
                        if self.config.fail_fast {
                            return Err(self.abort(source, e.to_string()));
                        }
                        DocumentResult::failure(source.as_str(), format, e.to_string())
                    }
                };

                if result.succeeded() {
                    succeeded += 1;
                    tracing::info!(
                        "Processed {}: {} characters, {} blocks",
                        source,
                        result.text_length(),
                        result.num_blocks()
                    );
                } else {
                    let error = result.error().unwrap_or("unknown error").to_string();
                    if self.config.fail_fast {
                        return Err(self.abort(source, error));
                    }
                    failed += 1;
                    if self.config.log_errors {
                        tracing::warn!("OCR failed for {}: {}", source, error);
                    }
                }

                results.push(result);
            }
        }

        tracing::info!(
            "Batch complete: {} succeeded, {} failed",
            succeeded,
            failed
        );
        Ok(results)
    }

    fn abort(&self, source: &str, error: String) -> BatchError {
        if self.config.log_errors {
            tracing::error!("Aborting batch at {}: {}", source, error);
        }
        BatchError::Aborted {
            source_path: source.to_string(),
            error,
        }
    }
}
