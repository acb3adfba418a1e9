//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a channel, a database record or a terminal progress bar without
//! the library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2video::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     units: Arc<AtomicUsize>,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, position: usize, total: usize, duration_secs: f64) {
//!         self.units.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Unit {}/{} narrated ({:.1}s)", position + 1, total, duration_secs);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     units: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Generation,
    Rendering,
    Synthesis,
    Encoding,
    Shorts,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Generation => "generation",
            Stage::Rendering => "rendering",
            Stage::Synthesis => "synthesis",
            Stage::Encoding => "encoding",
            Stage::Shorts => "shorts",
        }
    }
}

/// Called by the pipeline as a run progresses.
///
/// Runs are strictly sequential, so events arrive in order from one task at
/// a time. All methods have default no-op implementations so callers only
/// override what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once after text extraction.
    ///
    /// # Arguments
    /// * `text_chars`: characters of extracted text
    /// * `chunk_count`: chunks that will be sent to the generation service
    fn on_run_start(&self, text_chars: usize, chunk_count: usize) {
        let _ = (text_chars, chunk_count);
    }

    /// Called when a stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called just before a chunk is sent for generation (0-based index).
    fn on_chunk_start(&self, chunk: usize, total: usize) {
        let _ = (chunk, total);
    }

    /// Called when a chunk has produced a valid bundle.
    fn on_chunk_complete(&self, chunk: usize, total: usize, slides: usize) {
        let _ = (chunk, total, slides);
    }

    /// Called once the number of timeline units is known (slides + 2).
    fn on_units_planned(&self, total: usize) {
        let _ = total;
    }

    /// Called when a timeline unit's narration has been synthesized and measured.
    ///
    /// `position` is 0 for the intro and `total - 1` for the outro.
    fn on_unit_complete(&self, position: usize, total: usize, duration_secs: f64) {
        let _ = (position, total, duration_secs);
    }

    /// Called once after the video has been written.
    fn on_run_complete(&self, units: usize, total_duration_secs: f64) {
        let _ = (units, total_duration_secs);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
