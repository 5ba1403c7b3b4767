//! Configuration for a diagnosis request.
//!
//! All behaviour is controlled through [`DiagnosisConfig`], built via its
//! [`DiagnosisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config across handlers and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest; `build()` validates the result once,
//! so handlers never re-check invariants.

use crate::error::DiagAssistError;
use crate::prompts::SYSTEM_INSTRUCTION;
use std::fmt;
use std::path::PathBuf;

/// Configuration for the diagnosis pipeline.
///
/// Built via [`DiagnosisConfig::builder()`].
///
/// # Example
/// ```rust
/// use diag_assist::DiagnosisConfig;
///
/// let config = DiagnosisConfig::builder()
///     .api_key("test-key")
///     .model("gemini-2.0-flash")
///     .temperature(1.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DiagnosisConfig {
    /// API credential for the generation service.
    ///
    /// Resolved from `GEMINI_API_KEY` at `build()` time when not set
    /// explicitly. This is the only credential the system needs.
    pub api_key: String,

    /// Generation model identifier. Default: `gemini-2.0-flash`.
    pub model: String,

    /// Sampling temperature. Range 0.0–2.0. Default: 1.0.
    ///
    /// The default deliberately favours diverse phrasing over determinism:
    /// the reply is free prose inside a JSON shell, and a colder setting
    /// buys no extra structural reliability — that is the recovery
    /// pipeline's job.
    pub temperature: f32,

    /// Maximum tokens the model may generate per reply. Default: 8192.
    ///
    /// A full differential diagnosis with reasoning, biases, and articles
    /// routinely exceeds 2 000 output tokens. Setting this too low
    /// truncates the JSON mid-object, which the recovery pipeline can only
    /// repair at the outer wrapper.
    pub max_output_tokens: u32,

    /// Whether the search-grounding tool is attached to the request.
    /// Default: true.
    ///
    /// Grounding lets the model cite articles from the trusted medical
    /// domains named in the system instruction instead of inventing them.
    pub search_grounding: bool,

    /// Per-call timeout for the generation API in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Directory where transmissible attachment bytes are staged before
    /// each request. Default: `uploads/`.
    ///
    /// An audit/debug aid, not a correctness requirement: staging failures
    /// are logged and ignored.
    pub staging_dir: PathBuf,

    /// Maximum PDF pages rasterised per uploaded document. Default: 32.
    ///
    /// Each page becomes one image part in the request; an unbounded
    /// scanned chart would blow the request size limit long before the
    /// model ran out of context.
    pub max_pdf_pages: usize,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 2000.
    ///
    /// A safety cap independent of page size, so pdfium never allocates
    /// unbounded pixel buffers for poster-sized pages.
    pub max_rendered_pixels: u32,

    /// Custom system instruction. If None, uses the built-in diagnostic
    /// policy from [`crate::prompts`].
    pub system_instruction: Option<String>,
}

impl DiagnosisConfig {
    /// Create a new builder.
    pub fn builder() -> DiagnosisConfigBuilder {
        DiagnosisConfigBuilder {
            config: Self::unvalidated_default(),
        }
    }

    /// The effective system instruction for this config.
    pub fn system_instruction(&self) -> &str {
        self.system_instruction
            .as_deref()
            .unwrap_or(SYSTEM_INSTRUCTION)
    }

    fn unvalidated_default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 1.0,
            max_output_tokens: 8192,
            search_grounding: true,
            api_timeout_secs: 120,
            staging_dir: PathBuf::from("uploads"),
            max_pdf_pages: 32,
            max_rendered_pixels: 2000,
            system_instruction: None,
        }
    }
}

impl fmt::Debug for DiagnosisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("search_grounding", &self.search_grounding)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("staging_dir", &self.staging_dir)
            .field("max_pdf_pages", &self.max_pdf_pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field(
                "system_instruction",
                &self.system_instruction.as_ref().map(|_| "<custom>"),
            )
            .finish()
    }
}

/// Builder for [`DiagnosisConfig`].
#[derive(Debug)]
pub struct DiagnosisConfigBuilder {
    config: DiagnosisConfig,
}

impl DiagnosisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n.max(1);
        self
    }

    pub fn search_grounding(mut self, enabled: bool) -> Self {
        self.config.search_grounding = enabled;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn system_instruction(mut self, text: impl Into<String>) -> Self {
        self.config.system_instruction = Some(text.into());
        self
    }

    /// Build the configuration, resolving the API key and validating
    /// constraints.
    ///
    /// The key falls back to the `GEMINI_API_KEY` environment variable
    /// when not set explicitly; an empty key is a hard error because every
    /// diagnosis request needs it.
    pub fn build(mut self) -> Result<DiagnosisConfig, DiagAssistError> {
        if self.config.api_key.is_empty() {
            self.config.api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        }
        if self.config.api_key.is_empty() {
            return Err(DiagAssistError::MissingApiKey);
        }
        if self.config.model.trim().is_empty() {
            return Err(DiagAssistError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
