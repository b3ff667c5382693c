//! Configuration management for medscan using the prefer crate.
//!
//! Configuration is an explicit value handed to each component; nothing here
//! is global. Files are discovered by prefer (`medscan.{toml,yaml,json}`) or
//! given with `--config`, then parsed with serde based on the extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ResultFormat;
use crate::services::batch::BatchConfig;

/// Name of the profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "medical_documents";

/// Invalid configuration or caller misuse. Never recorded per item.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid result format '{0}' (expected text_only, structured or full)")]
    InvalidFormat(String),

    #[error("Invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Unknown OCR config type: {name}. Available: {available}")]
    UnknownProfile { name: String, available: String },

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// A named OCR processing profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub result_format: ResultFormat,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Expected document languages. Named when `process` flags a result as
    /// likely mixed-language.
    #[serde(default = "default_language_hints")]
    pub language_hints: Vec<String>,
    /// Limit on images processed per run (none = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

fn default_batch_size() -> usize {
    10
}

fn default_language_hints() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_profiles() -> BTreeMap<String, OcrProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        DEFAULT_PROFILE.to_string(),
        OcrProfile {
            name: "Medical Document OCR".to_string(),
            description: "Extract text from medical documents, prescriptions, lab reports"
                .to_string(),
            result_format: ResultFormat::Full,
            batch_size: default_batch_size(),
            language_hints: default_language_hints(),
            max_items: None,
        },
    );
    profiles
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

/// Per-item error policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// Attempts after the first one, consumed by `RetryingFetcher`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Log per-item failures at error level.
    #[serde(default = "default_true")]
    pub log_errors: bool,
    /// Abort the whole batch on the first failure.
    #[serde(default, alias = "raise_on_failure")]
    pub fail_fast: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            log_errors: true,
            fail_fast: false,
        }
    }
}

impl ErrorHandlingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Local JSON backup of batch results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBackupConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Supports `{batch}` and `{timestamp}` placeholders.
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./ocr_results")
}

fn default_filename_pattern() -> String {
    "{batch}_ocr_results_{timestamp}.json".to_string()
}

impl Default for JsonBackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_output_dir(),
            filename_pattern: default_filename_pattern(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json_backup: JsonBackupConfig,
}

/// Logging overrides applied on top of `RUST_LOG` / `--verbose`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `medscan=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Also write log lines to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name.
    #[serde(default = "default_profile_name")]
    pub profile: String,
    /// Directory holding captured provider responses (`<image name>.json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses_dir: Option<PathBuf>,
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, OcrProfile>,
    #[serde(default)]
    pub errors: ErrorHandlingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            profiles: default_profiles(),
            errors: ErrorHandlingConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            responses_dir: None,
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults (with env overrides) when no file is found.
    pub async fn load() -> Self {
        match prefer::load("medscan").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on the file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Parse configuration text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Apply `MEDSCAN_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(profile) = std::env::var("MEDSCAN_PROFILE")
            .ok()
            .filter(|s| !s.is_empty())
        {
            tracing::debug!("Using MEDSCAN_PROFILE from environment: {}", profile);
            self.profile = profile;
        }
        if let Ok(value) = std::env::var("MEDSCAN_FAIL_FAST") {
            self.errors.fail_fast = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(dir) = std::env::var("MEDSCAN_RESPONSES_DIR")
            .ok()
            .filter(|s| !s.is_empty())
        {
            self.responses_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Look up a profile by name.
    pub fn get_profile(&self, name: &str) -> Result<&OcrProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                available: self
                    .profiles
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// The active profile.
    pub fn active_profile(&self) -> Result<&OcrProfile, ConfigError> {
        self.get_profile(&self.profile)
    }

    /// Batch settings for the active profile, validated.
    pub fn batch_config(&self) -> Result<BatchConfig, ConfigError> {
        let profile = self.active_profile()?;
        BatchConfig {
            batch_size: profile.batch_size,
            max_items: profile.max_items,
            fail_fast: self.errors.fail_fast,
            log_errors: self.errors.log_errors,
        }
        .validated()
    }
}

/// Storage prefix holding a user's images: `{uid}/images/` or
/// `{uid}/images/{subfolder}/`.
pub fn images_prefix(uid: &str, subfolder: Option<&str>) -> String {
    match subfolder.filter(|s| !s.is_empty()) {
        Some(sub) => format!("{}/images/{}/", uid, sub),
        None => format!("{}/images/", uid),
    }
}

/// Storage prefix for a user's saved OCR results: `{uid}/ocr_results/`.
pub fn results_prefix(uid: &str) -> String {
    format!("{}/ocr_results/", uid)
}
