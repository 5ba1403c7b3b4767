//! CLI binary for diag-assist.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DiagnosisConfig` and starts the HTTP service.

use anyhow::{Context, Result};
use clap::Parser;
use diag_assist::{create_app, DiagnosisConfig};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the service on the default port
  GEMINI_API_KEY=... diag-assist

  # Custom port and staging directory
  diag-assist --port 8080 --staging-dir /var/lib/diag-assist/uploads

  # A different generation model, colder sampling
  diag-assist --model gemini-2.5-pro --temperature 0.4

TYPICAL SESSION (curl):
  # 1. Create a session
  curl -X POST localhost:3000/sessions

  # 2. Generate a diagnosis
  curl -X POST localhost:3000/sessions/<id>/diagnose \
       -F prompt='58-year-old, productive cough, fever for 3 days' \
       -F file=@chest_xray.png

  # 3. Fetch the report, toggle follow-ups, export the PDF
  curl localhost:3000/sessions/<id>/report
  curl -X POST localhost:3000/sessions/<id>/followup
  curl -X POST localhost:3000/sessions/<id>/export \
       -H 'Content-Type: application/json' \
       -d '{"patient_name": "Jane Doe", "clinician_signature": "Dr. A"}'

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     API key for the generation service (required)
  PDFIUM_LIB_PATH    Path to libpdfium for PDF rasterisation

PDF EXPORT:
  Report export pipes HTML through wkhtmltopdf. Install it and ensure it
  is on PATH; export errors are reported inline and never affect the
  stored diagnosis.
"#;

/// Medical diagnosis assistant HTTP service.
#[derive(Parser, Debug)]
#[command(
    name = "diag-assist",
    version,
    about = "Medical diagnosis assistant — vision LLM analysis with structured-report recovery",
    long_about = "Starts the diagnosis assistant HTTP service: upload medical images or PDFs \
with free-text patient notes, receive a structured diagnostic report, and export it as PDF.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Bind address.
    #[arg(long, env = "DIAG_ASSIST_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Generation model identifier.
    #[arg(long, env = "DIAG_ASSIST_MODEL", default_value = "gemini-2.0-flash")]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DIAG_ASSIST_TEMPERATURE", default_value_t = 1.0)]
    temperature: f32,

    /// Max output tokens per reply.
    #[arg(long, env = "DIAG_ASSIST_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: u32,

    /// Per-call API timeout in seconds.
    #[arg(long, env = "DIAG_ASSIST_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Staging directory for uploaded attachment bytes.
    #[arg(long, env = "DIAG_ASSIST_STAGING_DIR", default_value = "uploads")]
    staging_dir: PathBuf,

    /// Max PDF pages rasterised per document.
    #[arg(long, env = "DIAG_ASSIST_MAX_PDF_PAGES", default_value_t = 32)]
    max_pdf_pages: usize,

    /// Disable the search-grounding tool.
    #[arg(long, env = "DIAG_ASSIST_NO_SEARCH")]
    no_search: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DIAG_ASSIST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DIAG_ASSIST_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = DiagnosisConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .staging_dir(&cli.staging_dir)
        .max_pdf_pages(cli.max_pdf_pages)
        .search_grounding(!cli.no_search)
        .build()
        .context("Invalid configuration")?;

    // ── Serve ────────────────────────────────────────────────────────────
    let app = create_app(config);
    let listener = TcpListener::bind(format!("{}:{}", cli.host, cli.port))
        .await
        .with_context(|| format!("Could not bind {}:{}", cli.host, cli.port))?;
    let addr = listener.local_addr()?;

    info!("Medical Diagnosis Assistant listening on {addr}");
    info!("Create a session:  POST http://{addr}/sessions");
    info!("Health check:      GET  http://{addr}/health");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
