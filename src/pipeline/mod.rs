//! Pipeline stages for one diagnosis request.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. the rasterisation backend) without touching the
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ encode ──▶ invoke ──▶ recover
//! (uploads)  (PNG/b64)  (Gemini)   (repair + parse)
//! ```
//!
//! 1. [`ingest`]  — normalise uploaded files into attachment payloads;
//!    PDFs are rasterised per page in `spawn_blocking` because pdfium is
//!    not async-safe
//! 2. [`encode`]  — PNG-encode bitmaps and base64-wrap the bytes for the
//!    multimodal request body
//! 3. [`invoke`]  — the single generation API call; the only stage with
//!    network I/O
//! 4. [`recover`] — the ordered textual-repair pipeline that turns the
//!    untrusted reply into a structured record, or fails gracefully

pub mod encode;
pub mod ingest;
pub mod invoke;
pub mod recover;
