//! Storage collaborators: image listing and JSON result persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{images_prefix, results_prefix, JsonBackupConfig};
use crate::models::{AnalysisReport, DocumentResult};

/// Extensions recognized as images, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid results file {path}: {message}")]
    InvalidPayload { path: PathBuf, message: String },
}

/// Whether `path` has a recognized image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Images stored for one user under `root`, optionally inside a subfolder.
pub fn list_user_images(
    root: &Path,
    uid: &str,
    subfolder: Option<&str>,
) -> std::io::Result<Vec<String>> {
    list_images(&root.join(images_prefix(uid, subfolder)))
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path.to_string_lossy().into_owned());
        }
    }
    images.sort();
    Ok(images)
}

/// Persists a finished batch.
pub trait ResultSink {
    /// Write results and report, returning where they went.
    fn write(&self, results: &[DocumentResult], report: &AnalysisReport)
        -> Result<PathBuf, SinkError>;
}

/// Persisted batch payload.
#[derive(Debug, Serialize)]
struct BatchPayload<'a> {
    batch_id: &'a str,
    timestamp: DateTime<Utc>,
    num_results: usize,
    profile: &'a str,
    results: &'a [DocumentResult],
    report: &'a AnalysisReport,
}

/// Writes each batch to a JSON file under the configured output directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
    filename_pattern: String,
    batch_id: String,
    profile: String,
}

impl JsonFileSink {
    pub fn new(config: &JsonBackupConfig, profile: impl Into<String>) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            filename_pattern: config.filename_pattern.clone(),
            batch_id: Uuid::new_v4().to_string(),
            profile: profile.into(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Write into the user's results folder below the current output dir.
    pub fn for_user(mut self, uid: &str) -> Self {
        self.output_dir = self.output_dir.join(results_prefix(uid));
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// File name for a batch written at `now`.
    pub fn file_name(&self, now: DateTime<Utc>) -> String {
        self.filename_pattern
            .replace("{batch}", &self.batch_id)
            .replace("{timestamp}", &now.format("%Y%m%d_%H%M%S").to_string())
    }

    fn ensure_dir(&self) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| SinkError::Io {
            path: self.output_dir.clone(),
            source: e,
        })
    }
}

impl ResultSink for JsonFileSink {
    fn write(
        &self,
        results: &[DocumentResult],
        report: &AnalysisReport,
    ) -> Result<PathBuf, SinkError> {
        self.ensure_dir()?;
        let now = Utc::now();
        let path = self.output_dir.join(self.file_name(now));

        let payload = BatchPayload {
            batch_id: &self.batch_id,
            timestamp: now,
            num_results: results.len(),
            profile: &self.profile,
            results,
            report,
        };
        write_json(&path, &serde_json::to_string_pretty(&payload)?)?;

        tracing::info!("Saved {} OCR results to {}", results.len(), path.display());
        Ok(path)
    }
}

/// Write a standalone report file.
pub fn write_report(path: &Path, report: &AnalysisReport) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    write_json(path, &report.to_json_pretty()?)
}

/// Load results saved by `JsonFileSink`, or a bare JSON array of results.
pub fn load_results(path: &Path) -> Result<Vec<DocumentResult>, SinkError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SinkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let invalid = |message: String| SinkError::InvalidPayload {
        path: path.to_path_buf(),
        message,
    };

    let mut saved: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
    if let Some(batch_id) = saved.get("batch_id").and_then(|v| v.as_str()) {
        tracing::debug!("Loading batch {} from {}", batch_id, path.display());
    }
    let results = saved.get_mut("results").map(serde_json::Value::take);
    let items = match results {
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => return Err(invalid("\"results\" is not an array".to_string())),
        None => match saved {
            serde_json::Value::Array(items) => items,
            _ => return Err(invalid("expected a results array".to_string())),
        },
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| invalid(format!("result {}: {}", i, e)))
        })
        .collect()
}

fn write_json(path: &Path, json: &str) -> Result<(), SinkError> {
    std::fs::write(path, json).map_err(|e| SinkError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
