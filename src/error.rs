//! Error types for the diag-assist library.
//!
//! Three distinct types reflect three distinct failure scopes:
//!
//! * [`DiagAssistError`] — **Fatal**: the operation cannot proceed at all
//!   (missing credential, invalid configuration, export renderer broken).
//!   Returned as `Err(DiagAssistError)` from the affected entry point.
//!
//! * [`DiagnosisFailure`] — **Per-request, expected**: the external model
//!   call failed, or its reply could not be parsed after every repair step.
//!   Never propagated as a fault; the orchestrator substitutes the fixed
//!   fallback record and surfaces the failure text to the user.
//!
//! * [`IngestionWarning`] — **Per-file, non-fatal**: one uploaded file was
//!   skipped (unsupported type, undecodable bytes) while the rest of the
//!   batch continued. Collected into the diagnosis outcome.
//!
//! The separation lets callers decide their own tolerance: a skipped file
//! or a failed parse is reported, never thrown.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All fatal errors returned by the diag-assist library.
///
/// Request-level failures use [`DiagnosisFailure`] and file-level ones
/// [`IngestionWarning`]; neither is propagated through this type.
#[derive(Debug, Error)]
pub enum DiagAssistError {
    /// No API credential available for the generation service.
    #[error(
        "No API key configured for the generation service.\n\
         Set GEMINI_API_KEY or provide one via DiagnosisConfig::builder().api_key(...)."
    )]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// PDF export failed (renderer missing, crashed, or produced nothing).
    #[error("PDF export failed: {detail}\nInstall wkhtmltopdf and ensure it is on PATH.")]
    Export { detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A per-request failure the pipeline is expected to absorb.
///
/// Both variants end the same way: the caller substitutes the fixed
/// "Failed image" record and shows `detail` to the user. No retry is
/// attempted for either — a failed call or parse requires the user to
/// re-trigger the action.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DiagnosisFailure {
    /// The external model call failed (network, service, or an empty reply).
    #[error("Model call failed: {detail}")]
    Transport { detail: String },

    /// The model reply could not be parsed as JSON after all repair steps.
    #[error("Could not parse the model reply as JSON: {detail}")]
    Recovery { detail: String },
}

/// A non-fatal warning for a single uploaded file.
///
/// The file is skipped; the rest of the batch is processed normally.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum IngestionWarning {
    /// The file's MIME type is outside the accepted set.
    #[error("Unsupported file type '{mime}' for '{file}' — skipped")]
    UnsupportedType { file: String, mime: String },

    /// A supported image file could not be decoded.
    #[error("Could not decode image '{file}': {detail} — skipped")]
    Undecodable { file: String, detail: String },

    /// A PDF could not be rasterised into page bitmaps.
    #[error("Could not rasterise PDF '{file}': {detail} — skipped")]
    PdfRenderFailed { file: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_mentions_env_var() {
        let msg = DiagAssistError::MissingApiKey.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn transport_failure_display() {
        let f = DiagnosisFailure::Transport {
            detail: "HTTP 503".into(),
        };
        assert!(f.to_string().contains("HTTP 503"));
    }

    #[test]
    fn recovery_failure_display() {
        let f = DiagnosisFailure::Recovery {
            detail: "EOF while parsing an object at line 1 column 42".into(),
        };
        assert!(f.to_string().contains("column 42"));
    }

    #[test]
    fn unsupported_type_names_file_and_mime() {
        let w = IngestionWarning::UnsupportedType {
            file: "notes.txt".into(),
            mime: "text/plain".into(),
        };
        let msg = w.to_string();
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("text/plain"));
    }

    #[test]
    fn export_error_carries_install_hint() {
        let e = DiagAssistError::Export {
            detail: "wkhtmltopdf not found".into(),
        };
        assert!(e.to_string().contains("PATH"));
    }
}
