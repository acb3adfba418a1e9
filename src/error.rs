//! Error types for the edgequake-pdf2video library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`PipelineError`]: **Fatal** for the run. Every variant names the stage
//!   that failed (see [`PipelineError::stage`]) and carries the chunk or unit
//!   index when one applies, so a failed run can be reproduced from the
//!   message alone. No stage ever swallows an error or produces a partial
//!   video.
//!
//! * [`GenerationError`]: the outcome of a single call to the generation
//!   service. It keeps the raw response text for diagnosis and knows whether
//!   it is worth retrying: transport failures are, malformed or
//!   schema-violating responses are not (the same input produces the same
//!   bad output).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2video library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input / extraction ────────────────────────────────────────────────
    /// The source document could not be read or parsed.
    #[error("Could not extract text from '{path}': {detail}")]
    Extraction { path: PathBuf, detail: String },

    // ── Generation ────────────────────────────────────────────────────────
    /// A chunk could not be turned into a valid content bundle.
    #[error("Content generation failed for chunk {chunk}: {source}")]
    Generation {
        chunk: usize,
        #[source]
        source: GenerationError,
    },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Rendering / alignment ─────────────────────────────────────────────
    /// The slide deck could not be rendered to images.
    #[error("Slide rendering failed: {detail}")]
    Rendering { detail: String },

    /// The number of rendered images does not match the number of units.
    #[error("Alignment mismatch: expected {expected} slide images (title + slides + closing), got {actual}")]
    Alignment { expected: usize, actual: usize },

    // ── Narration ─────────────────────────────────────────────────────────
    /// Narration audio could not be produced or measured for a unit.
    #[error("Narration synthesis failed for {unit}: {detail}")]
    Synthesis { unit: String, detail: String },

    // ── Encoding / output ─────────────────────────────────────────────────
    /// The final mux/encode step failed. No file is left at `path`.
    #[error("Video encoding failed for '{path}': {detail}")]
    Encoding { path: PathBuf, detail: String },

    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Short name of the pipeline stage this error belongs to.
    ///
    /// Used by the CLI to print `"<stage> failed: ..."`.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Extraction { .. } => "extraction",
            PipelineError::Generation { .. } | PipelineError::ProviderNotConfigured { .. } => {
                "generation"
            }
            PipelineError::Rendering { .. } => "rendering",
            PipelineError::Alignment { .. } => "alignment",
            PipelineError::Synthesis { .. } => "synthesis",
            PipelineError::Encoding { .. } => "encoding",
            PipelineError::OutputWriteFailed { .. } => "output",
            PipelineError::InvalidConfig(_) => "configuration",
            PipelineError::Internal(_) => "internal",
        }
    }
}

/// Failure of one generation-service call.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum GenerationError {
    /// The service could not be reached, timed out, or returned an API error.
    #[error("generation service call failed after {attempts} attempt(s): {detail}")]
    Transport { detail: String, attempts: u32 },

    /// The response was not valid JSON (after fence stripping).
    #[error("response is not valid JSON: {detail}\nRaw response:\n{raw}")]
    MalformedJson { detail: String, raw: String },

    /// The response was JSON but did not match the content schema.
    #[error("response does not match the content schema: {detail}\nRaw response:\n{raw}")]
    Schema { detail: String, raw: String },
}

impl GenerationError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Transport { .. })
    }

    /// The raw response text, when the service answered at all.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            GenerationError::Transport { .. } => None,
            GenerationError::MalformedJson { raw, .. } | GenerationError::Schema { raw, .. } => {
                Some(raw)
            }
        }
    }
}
