//! # edgequake-pdf2video
//!
//! Turn PDF documents into narrated explainer videos.
//!
//! ## Why this crate?
//!
//! Turning a paper or report into a video normally means writing slides,
//! recording narration, and lining the two up by hand. This crate asks an
//! LLM for structured slides with a narration script per slide, renders the
//! slides, synthesizes each script, and shows every slide for exactly as
//! long as its narration plays.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (spawn_blocking)
//!  ├─ 3. Chunk     lossless, char-bounded chunks (default 100 000 chars)
//!  ├─ 4. Generate  one LLM call per chunk → validated slides + narration
//!  ├─ 5. Render    Marp deck (title + slides + closing) → PNG per slide
//!  ├─ 6. Narrate   edge-tts per unit, ffprobe for the exact duration
//!  └─ 7. Encode    ffmpeg concat, atomic write to Output/final_video.mp4
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2video::{convert, PipelineConfig, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = PipelineConfig::default();
//!     match convert("paper.pdf", &config).await? {
//!         RunOutcome::Completed(summary) => {
//!             println!("{} ({:.1}s)", summary.video_path.display(), summary.total_duration_secs);
//!         }
//!         RunOutcome::NothingToGenerate => eprintln!("no text in document"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! Besides the pdfium library, a production run needs `marp`, `edge-tts`,
//! `ffmpeg` and `ffprobe` on `$PATH` (or configured via [`ToolPaths`]). Every
//! one of them sits behind a trait in [`services`], so a run can also be
//! driven with in-process implementations through [`convert_with`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2video` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
pub mod services;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AnimationLevel, AspectRatio, PipelineConfig, PipelineConfigBuilder, Resolution, Theme,
    ToolPaths, VideoConfig, VoiceStyle,
};
pub use convert::{convert, convert_sync, convert_topic, convert_topic_with, convert_with};
pub use error::{GenerationError, PipelineError};
pub use output::{RunOutcome, RunSummary, StageTimings, UnitSummary};
pub use pipeline::chunk::{Chunker, TextChunk};
pub use pipeline::encode::EncodeSettings;
pub use pipeline::generate::{ContentGenerator, GenerationSource};
pub use pipeline::timeline::{Timeline, TimelineAssembler, TimelineUnit, UnitPosition};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use schema::{
    ContentBundle, GeneratedContent, Presentation, ShortSegment, SlideContent, ThemeColors,
};
pub use services::{
    AudioProbe, GenerationBackend, Services, SlideRenderer, Synthesizer, TextExtractor,
    VideoEncoder,
};
