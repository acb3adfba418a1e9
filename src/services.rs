//! External collaborators of the pipeline.
//!
//! Text extraction, generation, speech synthesis, audio probing, slide
//! rendering and video encoding are each delegated to a third-party tool or
//! service. The orchestrator only sees them through these traits, so a run
//! can be driven end to end with in-process fakes.
//!
//! Implementations report failure as a plain detail string; the orchestrator
//! wraps it into a [`crate::PipelineError`] that names the stage and the
//! chunk or unit involved.

use crate::config::PipelineConfig;
use crate::pipeline::deck::SlideDeck;
use crate::pipeline::encode::{EncodeSettings, FfmpegEncoder};
use crate::pipeline::extract::PdfiumExtractor;
use crate::pipeline::generate::LlmBackend;
use crate::pipeline::render::MarpRenderer;
use crate::pipeline::speech::{EdgeTts, Ffprobe};
use crate::pipeline::timeline::Timeline;
use async_trait::async_trait;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads the plain text of a document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &Path) -> Result<String, String>;
}

/// Answers one prompt with raw text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, String>;
}

/// Turns narration text into an audio file at `output`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), String>;
}

/// Measures the playback duration of an audio file in seconds.
#[async_trait]
pub trait AudioProbe: Send + Sync {
    async fn duration_secs(&self, audio: &Path) -> Result<f64, String>;
}

/// Renders a deck into one image per slide, in deck order, inside `workspace`.
#[async_trait]
pub trait SlideRenderer: Send + Sync {
    async fn render(&self, deck: &SlideDeck, workspace: &Path) -> Result<Vec<PathBuf>, String>;
}

/// Encodes a timeline into a single video file at `output`.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(
        &self,
        timeline: &Timeline,
        settings: &EncodeSettings,
        output: &Path,
    ) -> Result<(), String>;
}

/// The full set of collaborators for one run.
#[derive(Clone)]
pub struct Services {
    pub extractor: Arc<dyn TextExtractor>,
    pub backend: Arc<dyn GenerationBackend>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub probe: Arc<dyn AudioProbe>,
    pub renderer: Arc<dyn SlideRenderer>,
    pub encoder: Arc<dyn VideoEncoder>,
}

impl Services {
    /// pdfium, the given LLM provider, edge-tts, ffprobe, marp and ffmpeg.
    pub fn production(config: &PipelineConfig, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            extractor: Arc::new(PdfiumExtractor),
            backend: Arc::new(LlmBackend::new(provider, config)),
            synthesizer: Arc::new(EdgeTts::new(
                &config.tools.edge_tts,
                &config.tts_voice,
                &config.speech_rate,
            )),
            probe: Arc::new(Ffprobe::new(&config.tools.ffprobe)),
            renderer: Arc::new(MarpRenderer::new(&config.tools.marp, config.dpi)),
            encoder: Arc::new(FfmpegEncoder::new(&config.tools.ffmpeg)),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
