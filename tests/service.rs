//! Router-level tests for the HTTP service.
//!
//! Every test drives the real router via `tower::ServiceExt::oneshot`, so
//! session lifecycle, status codes, and response shapes are exercised
//! without binding a socket. None of these tests reach the external
//! generation service: the diagnose tests submit only unsupported files,
//! which short-circuits to the empty-submission record before any network
//! call.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use diag_assist::{create_app, DiagnosisConfig};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

// ── Test helpers ─────────────────────────────────────────────────────────

fn test_app(staging: &std::path::Path) -> Router {
    let config = DiagnosisConfig::builder()
        .api_key("test-key")
        .staging_dir(staging)
        .api_timeout_secs(1)
        .build()
        .expect("valid test config");
    create_app(config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}

async fn create_session(app: &Router) -> Uuid {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["session_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("session id")
}

const BOUNDARY: &str = "diag-assist-test-boundary";

/// Hand-rolled multipart body: one `prompt` field plus `file` parts.
fn multipart_body(prompt: &str, files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{prompt}\r\n"
        )
        .as_bytes(),
    );
    for (filename, mime, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn diagnose_request(session_id: Uuid, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/sessions/{session_id}/diagnose"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn root_describes_the_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["endpoints"]["POST /sessions"].is_string());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let bogus = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{bogus}/report"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{bogus}/followup"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_before_any_diagnosis_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let session_id = create_session(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{session_id}/report"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn export_before_any_diagnosis_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let session_id = create_session(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/export"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"patient_name": "Jane"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn followup_toggle_flips_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let session_id = create_session(&app).await;

    for expected in [true, false] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/sessions/{session_id}/followup"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["show_followup"], expected);
    }
}

#[tokio::test]
async fn unsupported_file_is_warned_and_yields_the_empty_record() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let session_id = create_session(&app).await;

    let body = multipart_body(
        "patient notes",
        &[("notes.txt", "text/plain", b"just some text")],
    );
    let response = app
        .oneshot(diagnose_request(session_id, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["record"]["image_analysis"]["image_type"], "Empty image");
    let warnings = json["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("notes.txt"));
    assert!(json["failure_notice"].is_string());
}

#[tokio::test]
async fn report_reflects_the_stored_record_and_followup_flag() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let session_id = create_session(&app).await;

    // Generate (empty submission; no network involved).
    let response = app
        .clone()
        .oneshot(diagnose_request(session_id, multipart_body("notes", &[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Follow-up hidden by default.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{session_id}/report"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["kind"], "views");
    assert!(report.get("follow_up_recommendations").is_none());
    assert_eq!(report["image_and_analysis"]["image_type"], "Empty image");

    // Toggle, then the panel appears.
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/followup"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{session_id}/report"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let report = body_json(response).await;
    assert!(report["follow_up_recommendations"].is_array());
}

#[tokio::test]
async fn diagnose_on_unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = app
        .oneshot(diagnose_request(Uuid::new_v4(), multipart_body("x", &[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
