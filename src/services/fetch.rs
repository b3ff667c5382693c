//! Annotation fetch collaborators.
//!
//! The network call to the recognition provider lives behind
//! `AnnotationFetcher`. The batch loop never retries; `RetryingFetcher` wraps
//! any fetcher and owns the retry policy (`errors.max_retries`,
//! `errors.retry_delay_secs`).

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::ErrorHandlingConfig;
use crate::models::AnnotateImageResponse;

/// Errors from fetching an annotation payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No annotation response found for {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed response for {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Io { .. } | FetchError::Unavailable(_))
    }
}

/// Produces the raw provider response for a source path.
pub trait AnnotationFetcher: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    fn fetch(&self, source_path: &str) -> Result<AnnotateImageResponse, FetchError>;
}

/// Reads provider responses captured earlier as JSON sidecar files.
///
/// For `scans/a.jpg` the response is `scans/a.jpg.json`, or
/// `<responses_dir>/a.jpg.json` when a responses directory is configured.
#[derive(Debug, Clone, Default)]
pub struct SidecarFetcher {
    responses_dir: Option<PathBuf>,
}

impl SidecarFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.responses_dir = Some(dir.into());
        self
    }

    /// Location of the sidecar for `source_path`.
    pub fn response_path(&self, source_path: &str) -> PathBuf {
        let source = Path::new(source_path);
        let mut name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| source_path.into());
        name.push(".json");

        match &self.responses_dir {
            Some(dir) => dir.join(name),
            None => source.with_file_name(name),
        }
    }
}

impl AnnotationFetcher for SidecarFetcher {
    fn name(&self) -> &str {
        "sidecar"
    }

    fn fetch(&self, source_path: &str) -> Result<AnnotateImageResponse, FetchError> {
        let path = self.response_path(source_path);
        tracing::debug!("Loading response for {} from {}", source_path, path.display());

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(source_path.to_string())
            } else {
                FetchError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&contents).map_err(|e| FetchError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Retries retryable failures of an inner fetcher with a fixed delay.
pub struct RetryingFetcher<F> {
    inner: F,
    max_retries: u32,
    delay: Duration,
}

impl<F: AnnotationFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, max_retries: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }

    pub fn from_config(inner: F, config: &ErrorHandlingConfig) -> Self {
        Self::new(inner, config.max_retries, config.retry_delay())
    }
}

impl<F: AnnotationFetcher> AnnotationFetcher for RetryingFetcher<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, source_path: &str) -> Result<AnnotateImageResponse, FetchError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(source_path) {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        source_path,
                        e,
                        attempt,
                        self.max_retries,
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    impl AnnotationFetcher for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch(&self, _source_path: &str) -> Result<AnnotateImageResponse, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.retryable {
                    Err(FetchError::Unavailable("503".to_string()))
                } else {
                    Err(FetchError::NotFound("x".to_string()))
                }
            } else {
                Ok(AnnotateImageResponse::default())
            }
        }
    }

    fn flaky(failures: u32, retryable: bool) -> Flaky {
        Flaky {
            failures,
            calls: AtomicU32::new(0),
            retryable,
        }
    }

    #[test]
    fn test_retry_recovers() {
        let fetcher = RetryingFetcher::new(flaky(2, true), 3, Duration::ZERO);
        assert!(fetcher.fetch("a.jpg").is_ok());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_exhausted() {
        let fetcher = RetryingFetcher::new(flaky(5, true), 2, Duration::ZERO);
        assert!(matches!(
            fetcher.fetch("a.jpg"),
            Err(FetchError::Unavailable(_))
        ));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_retry_for_permanent_errors() {
        let fetcher = RetryingFetcher::new(flaky(1, false), 3, Duration::ZERO);
        assert!(matches!(fetcher.fetch("a.jpg"), Err(FetchError::NotFound(_))));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sidecar_paths() {
        let fetcher = SidecarFetcher::new();
        assert_eq!(
            fetcher.response_path("scans/a.jpg"),
            PathBuf::from("scans/a.jpg.json")
        );

        let fetcher = SidecarFetcher::new().with_responses_dir("/tmp/responses");
        assert_eq!(
            fetcher.response_path("scans/a.jpg"),
            PathBuf::from("/tmp/responses/a.jpg.json")
        );
    }

    #[test]
    fn test_sidecar_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(
            dir.path().join("scan.png.json"),
            r#"{"fullTextAnnotation": {"text": "hello"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.png.json"), "{").unwrap();

        let fetcher = SidecarFetcher::new();
        let response = fetcher.fetch(image.to_str().unwrap()).unwrap();
        assert_eq!(response.full_text_annotation.unwrap().text, "hello");

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            fetcher.fetch(missing.to_str().unwrap()),
            Err(FetchError::NotFound(_))
        ));

        let bad = dir.path().join("bad.png");
        assert!(matches!(
            fetcher.fetch(bad.to_str().unwrap()),
            Err(FetchError::Malformed { .. })
        ));
    }
}
