//! Diagnosis orchestration: one entry point gluing the pipeline stages.
//!
//! ```text
//! uploads ──▶ ingest ──▶ invoke ──▶ recover ──▶ DiagnosisOutcome
//!                │           │          │
//!                │ (empty)   │ (fail)   │ (fail)
//!                ▼           ▼          ▼
//!          "Empty image"   "Failed image" fallback record
//! ```
//!
//! The outcome always carries a record. Transport failures and parse
//! failures converge on the same fixed "Failed image" fallback, with the
//! failure text surfaced alongside, so presentation never has to handle
//! an absent record. An empty submission short-circuits before the model
//! call with the dedicated "Empty image" record.

use crate::config::DiagnosisConfig;
use crate::error::IngestionWarning;
use crate::pipeline::{ingest, invoke, recover};
use crate::record::DiagnosticRecord;
use crate::report::AttachmentPreview;
use std::time::Instant;
use tracing::{info, warn};

/// The result of one Generate Diagnosis action.
#[derive(Debug, Clone)]
pub struct DiagnosisOutcome {
    /// The structured record — recovered, or a fallback. Never absent.
    pub record: DiagnosticRecord,
    /// Previews of the attachments sent with the request.
    pub previews: Vec<AttachmentPreview>,
    /// One warning per skipped upload.
    pub warnings: Vec<IngestionWarning>,
    /// Failure text shown to the user when a fallback was substituted.
    pub failure_notice: Option<String>,
    /// Wall-clock duration of the whole action.
    pub duration_ms: u64,
}

/// Run one diagnosis request end to end.
///
/// Never fails: every error class downgrades to a fallback record plus a
/// user-visible notice, per the error-handling policy. The user
/// re-triggers the action if they want another attempt — no retries
/// happen here.
pub async fn diagnose(
    prompt: &str,
    files: Vec<ingest::UploadedFile>,
    config: &DiagnosisConfig,
) -> DiagnosisOutcome {
    let start = Instant::now();

    let ingest::IngestOutcome {
        attachments,
        warnings,
    } = ingest::normalize_uploads(files, config).await;

    let previews: Vec<AttachmentPreview> = attachments.iter().map(AttachmentPreview::from).collect();

    let (record, failure_notice) = if attachments.is_empty() {
        warn!("No usable attachments; substituting the empty-submission record");
        (
            DiagnosticRecord::empty_submission(),
            Some("Please upload files or a prompt.".to_string()),
        )
    } else {
        match invoke::invoke(prompt, &attachments, config).await {
            Ok(raw) => match recover::recover(&raw) {
                Ok(record) => (record, None),
                Err(failure) => {
                    warn!("{failure}");
                    (DiagnosticRecord::failed(), Some(failure.to_string()))
                }
            },
            Err(failure) => {
                warn!("{failure}");
                (DiagnosticRecord::failed(), Some(failure.to_string()))
            }
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Diagnosis finished in {duration_ms}ms ({} attachment(s), {} warning(s){})",
        previews.len(),
        warnings.len(),
        if failure_notice.is_some() {
            ", fallback record"
        } else {
            ""
        }
    );

    DiagnosisOutcome {
        record,
        previews,
        warnings,
        failure_notice,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EMPTY_IMAGE, FAILED_IMAGE};

    fn test_config(staging: &std::path::Path) -> DiagnosisConfig {
        DiagnosisConfig::builder()
            .api_key("test-key")
            .staging_dir(staging)
            .api_timeout_secs(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_submission_yields_empty_image_record_without_a_call() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = diagnose("prompt only", Vec::new(), &test_config(dir.path())).await;

        assert_eq!(outcome.record.image_analysis.image_type, EMPTY_IMAGE);
        assert!(outcome.failure_notice.is_some());
        assert!(outcome.previews.is_empty());
    }

    #[tokio::test]
    async fn unsupported_uploads_alone_count_as_empty_submission() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = diagnose(
            "prompt",
            vec![ingest::UploadedFile {
                filename: "notes.txt".into(),
                declared_mime: Some("text/plain".into()),
                bytes: b"plain text".to_vec(),
            }],
            &test_config(dir.path()),
        )
        .await;

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.record.image_analysis.image_type, EMPTY_IMAGE);
    }

    #[tokio::test]
    async fn transport_failure_yields_failed_image_record() {
        let dir = tempfile::tempdir().unwrap();
        // A syntactically invalid model name forces the request URL to a
        // nonexistent resource; with a 1s timeout the call fails quickly
        // either way, and the outcome must still carry a record.
        let config = DiagnosisConfig::builder()
            .api_key("test-key")
            .model("no-such-model")
            .staging_dir(dir.path())
            .api_timeout_secs(1)
            .build()
            .unwrap();

        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([9, 9, 9, 255]),
        ));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .unwrap();

        let outcome = diagnose(
            "prompt",
            vec![ingest::UploadedFile {
                filename: "scan.png".into(),
                declared_mime: None,
                bytes: png,
            }],
            &config,
        )
        .await;

        assert_eq!(outcome.record.image_analysis.image_type, FAILED_IMAGE);
        assert!(outcome.record.differential_diagnosis.is_empty());
        assert!(outcome.failure_notice.is_some());
        assert_eq!(outcome.previews.len(), 1);
    }
}
