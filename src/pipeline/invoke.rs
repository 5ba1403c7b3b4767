//! Model invocation: one `generateContent` call per diagnosis request.
//!
//! This module is intentionally thin — all prompt policy lives in
//! [`crate::prompts`] and all reply repair in [`crate::pipeline::recover`],
//! so the network call can change (endpoint, model, grounding) without
//! touching either.
//!
//! The request carries the prompt text followed by every attachment in
//! upload order, the fixed system instruction, a sampling temperature that
//! favours diverse phrasing, and the `google_search` grounding tool so the
//! model can cite articles from real sources. There is **no retry**: a
//! transport failure is reported once and the user re-triggers the action.

use crate::config::DiagnosisConfig;
use crate::error::DiagnosisFailure;
use crate::pipeline::encode;
use crate::pipeline::ingest::AttachmentPayload;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const GENERATION_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Send one diagnosis request and return the model's raw reply text.
///
/// The returned text has at most one outer code fence stripped (see
/// [`strip_response_fence`]); it is otherwise untrusted free text that the
/// recovery pipeline must still repair and parse.
pub async fn invoke(
    prompt: &str,
    attachments: &[AttachmentPayload],
    config: &DiagnosisConfig,
) -> Result<String, DiagnosisFailure> {
    let body = build_request_body(prompt, attachments, config);
    let url = format!(
        "{GENERATION_ENDPOINT}/{}:generateContent?key={}",
        config.model, config.api_key
    );

    info!(
        "Invoking {} with {} attachment part(s)",
        config.model,
        attachments.len()
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .build()
        .map_err(|e| DiagnosisFailure::Transport {
            detail: e.to_string(),
        })?;

    let response = client.post(&url).json(&body).send().await.map_err(|e| {
        let detail = if e.is_timeout() {
            format!("timed out after {}s", config.api_timeout_secs)
        } else {
            e.to_string()
        };
        DiagnosisFailure::Transport { detail }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(DiagnosisFailure::Transport {
            detail: format!("HTTP {status}: {error_body}"),
        });
    }

    let reply: Value = response
        .json()
        .await
        .map_err(|e| DiagnosisFailure::Transport {
            detail: format!("unreadable response body: {e}"),
        })?;

    let text = extract_candidate_text(&reply).ok_or_else(|| DiagnosisFailure::Transport {
        detail: "response contained no candidate text".to_string(),
    })?;

    debug!("Model replied with {} chars", text.len());
    Ok(strip_response_fence(&text))
}

/// Assemble the `generateContent` request body.
///
/// Part order matters and mirrors the upload order: the prompt text first,
/// then one `inline_data` PNG part per attachment.
fn build_request_body(
    prompt: &str,
    attachments: &[AttachmentPayload],
    config: &DiagnosisConfig,
) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    for attachment in attachments {
        parts.push(json!({
            "inline_data": {
                "mime_type": "image/png",
                "data": encode::base64_png(&attachment.png_bytes),
            }
        }));
    }

    let mut body = json!({
        "contents": [{ "parts": parts }],
        "systemInstruction": {
            "parts": [{ "text": config.system_instruction() }]
        },
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens,
        },
    });

    if config.search_grounding {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    body
}

/// Pull the reply text out of the first candidate.
///
/// Grounded replies can split their text across several parts; all text
/// parts are concatenated in order.
fn extract_candidate_text(reply: &Value) -> Option<String> {
    let parts = reply["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```\s*$").unwrap());

/// Strip one outer triple-backtick fence, with an optional `json` tag.
///
/// A syntactic convenience only — the enclosed text is returned unchanged
/// and carries no guarantee of being valid JSON.
pub(crate) fn strip_response_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}
