//! Report presentation: pure mappings from a record onto the fixed view
//! set and the print-ready document.
//!
//! Nothing here performs I/O or touches the session — the functions take
//! a [`DiagnosticRecord`] plus the attachment previews and return plain
//! data, so every presentation rule (primary selection, non-medical
//! suppression, follow-up gating) is testable without an HTTP harness.

use crate::pipeline::encode;
use crate::pipeline::ingest::AttachmentPayload;
use crate::record::{DiagnosticRecord, DifferentialDiagnosis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A lightweight attachment preview retained for report rendering.
///
/// The full [`AttachmentPayload`] (with its decoded bitmap) lives only
/// for the duration of one diagnosis request; the preview keeps just the
/// PNG as base64 plus the source label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPreview {
    pub source_label: String,
    pub png_base64: String,
}

impl From<&AttachmentPayload> for AttachmentPreview {
    fn from(payload: &AttachmentPayload) -> Self {
        Self {
            source_label: payload.source_label.clone(),
            png_base64: encode::base64_png(&payload.png_bytes),
        }
    }
}

/// The rendered report: either the full view set, or a single warning
/// when the model judged the uploads non-medical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// All detail views are suppressed, regardless of other field values.
    NonMedical { warning: String },
    /// The eight fixed sections plus the optional follow-up panel.
    Views(ReportViews),
}

/// Warning shown instead of the report for non-medical uploads.
pub const NON_MEDICAL_WARNING: &str = "The uploaded image appears to be non-medical or no image \
data was uploaded. Please upload a medical image or PDF for analysis.";

/// The fixed set of named report sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportViews {
    pub patient_information: PatientInformationView,
    /// The highest-probability differential entry; absent when the model
    /// returned no diagnoses.
    pub diagnosis: Option<DifferentialDiagnosis>,
    /// The full ranked list.
    pub other_diagnoses: Vec<DifferentialDiagnosis>,
    pub alternative_diagnoses: Vec<crate::record::AlternativeDiagnosis>,
    pub image_and_analysis: ImageAnalysisView,
    pub articles: Vec<String>,
    pub additional_info: AdditionalInfoView,
    pub confidence_level: f64,
    /// Present only while the follow-up panel is toggled on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_recommendations: Option<Vec<String>>,
    pub important_note: String,
}

/// Patient data with every field resolved to a displayable string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInformationView {
    pub age: String,
    pub symptoms: String,
    pub relevant_details: String,
}

/// Every attachment preview plus the model's image analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysisView {
    pub attachments: Vec<AttachmentPreview>,
    pub image_type: String,
    pub image_analysis: String,
}

/// Question/answer pairs plus the disclosed biases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalInfoView {
    pub answers: BTreeMap<String, String>,
    pub biases: Vec<crate::record::BiasDisclosure>,
}

const NOT_AVAILABLE: &str = "N/A";

impl Report {
    /// Map a record onto the view set.
    ///
    /// The non-medical sentinel short-circuits everything: whatever else
    /// the record contains, only the warning is shown.
    pub fn build(
        record: &DiagnosticRecord,
        previews: &[AttachmentPreview],
        show_followup: bool,
    ) -> Self {
        if record.is_non_medical() {
            return Report::NonMedical {
                warning: NON_MEDICAL_WARNING.to_string(),
            };
        }

        Report::Views(ReportViews {
            patient_information: PatientInformationView {
                age: record
                    .patient_information
                    .age
                    .map(format_age)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                symptoms: record
                    .patient_information
                    .symptoms
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                relevant_details: or_na(&record.patient_information.relevant_details),
            },
            diagnosis: record.primary_diagnosis().cloned(),
            other_diagnoses: record.differential_diagnosis.clone(),
            alternative_diagnoses: record.alternative_diagnoses.clone(),
            image_and_analysis: ImageAnalysisView {
                attachments: previews.to_vec(),
                image_type: or_na(&record.image_analysis.image_type),
                image_analysis: or_na(&record.image_analysis.image_analysis),
            },
            articles: record.articles.clone(),
            additional_info: AdditionalInfoView {
                answers: record.answer_to_question.clone(),
                biases: record.biases.clone(),
            },
            confidence_level: record.confidence_level,
            follow_up_recommendations: show_followup
                .then(|| record.follow_up_recommendations.clone()),
            important_note: record.important_note.clone(),
        })
    }
}

fn or_na(s: &str) -> String {
    if s.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        s.to_string()
    }
}

/// Drop the fractional part when the model sent a whole-number age.
fn format_age(age: f64) -> String {
    if age.fract() == 0.0 {
        format!("{}", age as i64)
    } else {
        format!("{age}")
    }
}

// ── Print document ───────────────────────────────────────────────────────

/// Render the print-ready HTML document for PDF export.
///
/// Patient identity, clinician notes, and the signature are user-supplied
/// — never model-derived. The timestamp is the generation time formatted
/// by the caller.
pub fn render_print_html(
    record: &DiagnosticRecord,
    patient_name: &str,
    clinician_notes: &str,
    clinician_signature: &str,
    timestamp: &str,
) -> String {
    let patient_name = if patient_name.is_empty() {
        "Not Specified".to_string()
    } else {
        escape_html(patient_name)
    };

    let primary_block = match record.primary_diagnosis() {
        Some(primary) => format!(
            "<p><strong>Diagnosis:</strong> {}</p>\n\
             <p><strong>Probability:</strong> {}%</p>\n\
             <p><strong>Reasoning:</strong> {}</p>\n\
             <p><strong>Severity:</strong> {}</p>\n\
             <p><strong>Risk Factors:</strong> {}</p>",
            escape_html(&primary.diagnosis),
            primary.probability,
            escape_html(&or_na(&primary.reasoning)),
            escape_html(&or_na(&primary.severity)),
            escape_html(&or_na(&primary.risk_factors)),
        ),
        None => "<p>No diagnosis found.</p>".to_string(),
    };

    let article_items: String = record
        .articles
        .iter()
        .map(|article| format!("<li>{}</li>", escape_html(article)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body {{ font-family: Arial, sans-serif; padding-top: 30px; }}
h1 {{ text-align: center; }}
h2 {{ color: #333; }}
p {{ line-height: 1.6; }}
.section {{ margin-bottom: 20px; }}
.date-time {{ text-align: right; font-style: italic; }}
</style>
</head>
<body>
<div class="date-time">{timestamp}</div>
<h1>Medical Diagnosis Assistant Report</h1>

<div class="section">
<h2>Patient Information</h2>
<p><strong>Patient Name:</strong> {patient_name}</p>
<p><strong>Age:</strong> {age}</p>
<p><strong>Symptoms:</strong> {symptoms}</p>
</div>

<div class="section">
<h2>Primary Diagnosis</h2>
{primary_block}
</div>

<div class="section">
<h2>Image Analysis</h2>
<p><strong>Image Type:</strong> {image_type}</p>
<p><strong>Analysis:</strong> {image_analysis}</p>
</div>

<div class="section">
<h2>Clinician's Notes</h2>
<p>{notes}</p>
</div>

<div class="section">
<h2>Clinician's Signature</h2>
<p>{signature}</p>
</div>

<div class="section">
<h2>Articles</h2>
<ul>
{article_items}
</ul>
</div>
</body>
</html>
"#,
        timestamp = escape_html(timestamp),
        patient_name = patient_name,
        age = escape_html(
            &record
                .patient_information
                .age
                .map(format_age)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        ),
        symptoms = escape_html(
            record
                .patient_information
                .symptoms
                .as_deref()
                .unwrap_or(NOT_AVAILABLE)
        ),
        primary_block = primary_block,
        image_type = escape_html(&or_na(&record.image_analysis.image_type)),
        image_analysis = escape_html(&or_na(&record.image_analysis.image_analysis)),
        notes = escape_html(clinician_notes),
        signature = escape_html(clinician_signature),
        article_items = article_items,
    )
}

/// Minimal HTML entity escaping for user- and model-supplied text.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
