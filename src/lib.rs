//! # diag-assist
//!
//! Interactive medical diagnosis assistant: vision-LLM analysis of
//! uploaded medical images and PDFs, with structured-report recovery.
//!
//! ## Why this crate?
//!
//! The diagnostic reasoning itself is delegated to an external generative
//! model — the engineering problem is everything around that call. The
//! model's reply is free text with no schema guarantee: fenced, truncated,
//! newline-riddled, or plain broken. This crate turns that untrusted blob
//! into a typed [`DiagnosticRecord`] with defined fallback behaviour, and
//! presents it as a fixed set of report views plus a downloadable PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (PNG/JPEG/PDF) + patient notes
//!  │
//!  ├─ 1. Ingest   decode rasters, rasterise PDF pages (pdfium,
//!  │              spawn_blocking), skip-and-warn unsupported files
//!  ├─ 2. Encode   PNG re-encode → base64 parts
//!  ├─ 3. Invoke   one generateContent call: fixed system instruction,
//!  │              temperature 1.0, google_search grounding
//!  ├─ 4. Recover  ordered textual repairs + one strict JSON parse;
//!  │              fallback record on any failure
//!  ├─ 5. Present  fixed view set, non-medical suppression, primary
//!  │              diagnosis selection
//!  └─ 6. Export   print HTML → wkhtmltopdf → base64 PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use diag_assist::{create_app, DiagnosisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key resolved from GEMINI_API_KEY
//!     let config = DiagnosisConfig::builder().build()?;
//!     let app = create_app(config);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `diag-assist` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! diag-assist = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod diagnose;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod report;
pub mod service;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DiagnosisConfig, DiagnosisConfigBuilder};
pub use diagnose::{diagnose, DiagnosisOutcome};
pub use error::{DiagAssistError, DiagnosisFailure, IngestionWarning};
pub use pipeline::ingest::UploadedFile;
pub use record::{DiagnosticRecord, DifferentialDiagnosis};
pub use report::{AttachmentPreview, Report, ReportViews};
pub use service::{create_app, AppState};
pub use session::{SessionState, SessionStore};
