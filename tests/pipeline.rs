//! End-to-end pipeline tests
//!
//! Images and captured provider responses are laid out in a temporary
//! directory, then listed, fetched, normalized, batched, reported and saved.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use medscan::config::{Config, JsonBackupConfig};
use medscan::models::{AnnotateImageResponse, EntityType, ResultFormat};
use medscan::services::{
    build_report, AnnotationFetcher, AnnotationNormalizer, BatchConfig, BatchError,
    BatchProcessor, FetchError, SidecarFetcher,
};
use medscan::storage::{list_images, load_results, JsonFileSink, ResultSink};
use tempfile::TempDir;

const LAB_REPORT: &str = r#"{
    "fullTextAnnotation": {
        "text": "Patient ID: ABC-123\nDate: 01/15/2024\nGlucose: 95 mg/dL\n",
        "pages": [{"confidence": 0.93, "blocks": [
            {"confidence": 0.95, "paragraphs": [{"words": [
                {"confidence": 0.96, "symbols": [{"text": "Patient"}]},
                {"confidence": 0.97, "symbols": [{"text": "ID:"}]},
                {"confidence": 0.92, "symbols": [{"text": "ABC-123"}]}
            ]}]},
            {"confidence": 0.7, "paragraphs": [{"words": [
                {"confidence": 0.7, "symbols": [{"text": "Glucose:"}]},
                {"confidence": 0.68, "symbols": [{"text": "95"}]},
                {"confidence": 0.72, "symbols": [{"text": "mg/dL"}]}
            ]}]}
        ]}]
    },
    "textAnnotations": [{"description": "Patient ID: ABC-123", "locale": "en"}]
}"#;

const PRESCRIPTION: &str = r#"{
    "fullTextAnnotation": {
        "text": "Patient ID: ABC-123\nRx: Amoxicillin 500 mg\nCall (555) 123-4567\n",
        "pages": [{"blocks": [
            {"confidence": 0.88, "paragraphs": [{"words": [
                {"confidence": 0.9, "symbols": [{"text": "Rx:"}]},
                {"confidence": 0.86, "symbols": [{"text": "Amoxicillin"}]}
            ]}]}
        ]}]
    }
}"#;

const PROVIDER_ERROR: &str = r#"{"error": {"code": 3, "message": "Bad image data."}}"#;

/// Three images: s1 and s3 succeed, s2 carries a provider error.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let files = [
        ("s1.jpg", LAB_REPORT),
        ("s2.png", PROVIDER_ERROR),
        ("s3.jpg", PRESCRIPTION),
    ];
    for (image, response) in files {
        std::fs::write(dir.path().join(image), b"image bytes").unwrap();
        std::fs::write(dir.path().join(format!("{}.json", image)), response).unwrap();
    }
    std::fs::write(dir.path().join("README.txt"), b"not an image").unwrap();
    dir
}

fn names(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            Path::new(p)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

/// Counts calls so tests can see what was never attempted.
struct Counting<F> {
    inner: F,
    calls: AtomicUsize,
}

impl<F: AnnotationFetcher> AnnotationFetcher for Counting<F> {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch(&self, source_path: &str) -> Result<AnnotateImageResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(source_path)
    }
}

#[test]
fn test_fail_open_batch_and_report() {
    let dir = fixture();
    let images = list_images(dir.path()).unwrap();
    assert_eq!(names(&images), vec!["s1.jpg", "s2.png", "s3.jpg"]);

    let processor = BatchProcessor::new(BatchConfig::default()).unwrap();
    let normalizer = AnnotationNormalizer::new(ResultFormat::Full);
    let results = processor
        .process(&images, &SidecarFetcher::new(), &normalizer)
        .unwrap();

    assert_eq!(results.len(), 3);
    let paths: Vec<String> = results.iter().map(|r| r.source_path().to_string()).collect();
    assert_eq!(names(&paths), vec!["s1.jpg", "s2.png", "s3.jpg"]);
    assert!(results[0].succeeded());
    assert!(!results[1].succeeded());
    assert_eq!(results[1].error(), Some("Bad image data."));
    assert!(results[2].succeeded());
    assert_eq!(results[0].num_words(), 6);

    let report = build_report(&results);
    assert_eq!(report.total, 3);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 1);
    assert!((report.success_rate - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.confidence.total_blocks, 3);
    assert_eq!(report.confidence.low_confidence_count, 1);

    let ids = &report.entities[&EntityType::PatientId];
    assert_eq!(ids.count, 2);
    assert_eq!(ids.unique_count, 1);
    assert_eq!(ids.top_5, vec![("ABC-123".to_string(), 2)]);
    assert!(report.entities.contains_key(&EntityType::Phone));
    assert!(report.entities.contains_key(&EntityType::Dosage));

    let json = report.to_json_value();
    assert_eq!(json["summary"]["total_documents"], 3);
    assert_eq!(json["text_metrics"]["total_text_blocks"], 3);
    assert_eq!(json["entities_found"]["patient_id"]["top_entries"][0][0], "ABC-123");
    assert_eq!(json["failed_documents"][0]["error"], "Bad image data.");
}

#[test]
fn test_fail_fast_never_touches_third_source() {
    let dir = fixture();
    let images = list_images(dir.path()).unwrap();

    let config = BatchConfig {
        fail_fast: true,
        ..BatchConfig::default()
    };
    let processor = BatchProcessor::new(config).unwrap();
    let fetcher = Counting {
        inner: SidecarFetcher::new(),
        calls: AtomicUsize::new(0),
    };
    let normalizer = AnnotationNormalizer::new(ResultFormat::Structured);

    match processor.process(&images, &fetcher, &normalizer) {
        Err(BatchError::Aborted { source_path, error }) => {
            assert!(source_path.ends_with("s2.png"));
            assert_eq!(error, "Bad image data.");
        }
        other => panic!("expected abort, got {:?}", other.map(|r| r.len())),
    }
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_response_is_recorded() {
    let dir = fixture();
    std::fs::write(dir.path().join("s4.gif"), b"no sidecar").unwrap();
    let images = list_images(dir.path()).unwrap();

    let processor = BatchProcessor::new(BatchConfig::default()).unwrap();
    let results = processor
        .process(&images, &SidecarFetcher::new(), &AnnotationNormalizer::default())
        .unwrap();

    assert_eq!(results.len(), 4);
    let missing = &results[3];
    assert!(!missing.succeeded());
    assert!(missing.error().unwrap().contains("No annotation response"));
}

#[test]
fn test_profile_drives_batch() {
    let dir = fixture();
    let images = list_images(dir.path()).unwrap();

    let toml = r#"
        profile = "quick"

        [profiles.quick]
        name = "Quick look"
        result_format = "text_only"
        batch_size = 1
        max_items = 2
    "#;
    let config = Config::parse(toml, "toml").unwrap();
    let profile = config.active_profile().unwrap();
    let processor = BatchProcessor::new(config.batch_config().unwrap()).unwrap();
    let normalizer = AnnotationNormalizer::new(profile.result_format);

    let results = processor
        .process(&images, &SidecarFetcher::new(), &normalizer)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].blocks().is_empty());
    assert!(results[0].full_text().contains("ABC-123"));
}

#[test]
fn test_full_and_structured_agree() {
    let dir = fixture();
    let images = list_images(dir.path()).unwrap();
    let processor = BatchProcessor::new(BatchConfig::default()).unwrap();
    let fetcher = SidecarFetcher::new();

    let full = processor
        .process(&images, &fetcher, &AnnotationNormalizer::new(ResultFormat::Full))
        .unwrap();
    let structured = processor
        .process(&images, &fetcher, &AnnotationNormalizer::new(ResultFormat::Structured))
        .unwrap();

    for (f, s) in full.iter().zip(&structured) {
        assert!(f.to_structured().same_content(s));
    }
}

#[test]
fn test_saved_results_rebuild_same_report() {
    let dir = fixture();
    let images = list_images(dir.path()).unwrap();
    let processor = BatchProcessor::new(BatchConfig::default()).unwrap();
    let results = processor
        .process(&images, &SidecarFetcher::new(), &AnnotationNormalizer::default())
        .unwrap();
    let report = build_report(&results);

    let out = tempfile::tempdir().unwrap();
    let backup = JsonBackupConfig {
        enabled: true,
        output_dir: out.path().to_path_buf(),
        ..JsonBackupConfig::default()
    };
    let sink = JsonFileSink::new(&backup, "medical_documents");
    let path = sink.write(&results, &report).unwrap();
    assert!(path.starts_with(out.path()));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["results"][0]["num_blocks"], 2);
    assert_eq!(saved["results"][0]["text_blocks"][0]["num_words"], 3);
    assert_eq!(
        saved["results"][0]["text_length"],
        results[0].text_length()
    );

    let loaded = load_results(&path).unwrap();
    assert_eq!(loaded.len(), results.len());
    assert_eq!(build_report(&loaded), report);
}
