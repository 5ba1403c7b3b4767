//! HTTP service surface: the user-facing controls as axum endpoints.
//!
//! One endpoint per control: create a session, generate a diagnosis
//! (multipart upload + prompt), fetch the report, toggle the follow-up
//! panel, export the PDF. Handlers only translate between HTTP and the
//! library — all business logic lives in [`crate::diagnose`],
//! [`crate::report`] and [`crate::export`], which keeps it testable
//! without this layer.

use crate::config::DiagnosisConfig;
use crate::diagnose;
use crate::export;
use crate::pipeline::ingest::UploadedFile;
use crate::report::{self, Report};
use crate::session::SessionStore;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

/// Default prompt used when the text field is left empty.
const DEFAULT_PROMPT: &str = "Just give output based on image.";

/// Upload size cap (multipart overhead included).
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Session not found", "session_id": id })),
    )
}

fn no_record_error() -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": "No diagnosis has been generated yet" })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message, "details": details })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DiagnosisConfig>,
    pub sessions: Arc<SessionStore>,
}

/// Build the service router around a validated configuration.
pub fn create_app(config: DiagnosisConfig) -> Router {
    build_router(AppState {
        config: Arc::new(config),
        sessions: Arc::new(SessionStore::new()),
    })
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}/diagnose", post(generate_diagnosis))
        .route("/sessions/{session_id}/report", get(get_report))
        .route("/sessions/{session_id}/followup", post(toggle_followup))
        .route("/sessions/{session_id}/export", post(export_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Medical Diagnosis Assistant",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /sessions": "Create an interactive session",
            "POST /sessions/{id}/diagnose": "Generate a diagnosis (multipart: prompt + files)",
            "GET /sessions/{id}/report": "Fetch the report views for the last diagnosis",
            "POST /sessions/{id}/followup": "Toggle the follow-up recommendations panel",
            "POST /sessions/{id}/export": "Export the PDF report",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<AppState>) -> Json<Value> {
    let id = state.sessions.create().await;
    info!("Session {id} created");
    Json(json!({ "session_id": id }))
}

/// The Generate Diagnosis action.
///
/// Multipart fields: `prompt` (free text, optional) and any number of
/// `file` parts. The outcome — including fallback records and per-file
/// warnings — is stored on the session and echoed back.
async fn generate_diagnosis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    if state.sessions.get(session_id).await.is_none() {
        return Err(not_found_error(session_id));
    }

    let mut prompt = String::new();
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or("") {
            "prompt" => {
                prompt = field
                    .text()
                    .await
                    .map_err(|e| bad_request_error(&format!("Unreadable prompt field: {e}")))?;
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let declared_mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request_error(&format!("Unreadable file field: {e}")))?;
                files.push(UploadedFile {
                    filename,
                    declared_mime,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let prompt = if prompt.trim().is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt
    };

    info!(
        "Session {session_id}: generating diagnosis ({} file(s))",
        files.len()
    );
    let outcome = diagnose::diagnose(&prompt, files, &state.config).await;

    let warnings: Vec<String> = outcome.warnings.iter().map(|w| w.to_string()).collect();
    let response = json!({
        "session_id": session_id,
        "record": outcome.record,
        "warnings": warnings,
        "failure_notice": outcome.failure_notice,
        "duration_ms": outcome.duration_ms,
    });

    state
        .sessions
        .update(session_id, |s| s.store_outcome(&outcome))
        .await
        .ok_or_else(|| not_found_error(session_id))?;

    Ok(Json(response))
}

async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Report> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| not_found_error(session_id))?;

    let record = session.record.as_ref().ok_or_else(no_record_error)?;
    Ok(Json(Report::build(
        record,
        &session.previews,
        session.show_followup,
    )))
}

async fn toggle_followup(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Value> {
    let show = state
        .sessions
        .update(session_id, |s| {
            s.show_followup = !s.show_followup;
            s.show_followup
        })
        .await
        .ok_or_else(|| not_found_error(session_id))?;

    Ok(Json(json!({ "session_id": session_id, "show_followup": show })))
}

/// Clinician-supplied fields for the print document.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub clinician_notes: String,
    #[serde(default)]
    pub clinician_signature: String,
}

async fn export_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Value> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| not_found_error(session_id))?;
    let record = session.record.as_ref().ok_or_else(no_record_error)?;

    let generated_at = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let html = report::render_print_html(
        record,
        &request.patient_name,
        &request.clinician_notes,
        &request.clinician_signature,
        &generated_at,
    );

    let pdf = export::render_pdf(&html)
        .await
        .map_err(|e| internal_error("PDF export failed", &e.to_string()))?;

    info!(
        "Session {session_id}: exported {} PDF bytes",
        pdf.len()
    );
    Ok(Json(json!({
        "session_id": session_id,
        "filename": "report.pdf",
        "generated_at": generated_at,
        "pdf_base64": STANDARD.encode(&pdf),
    })))
}
