//! Run results and on-disk artifacts other than the video itself.

use crate::error::PipelineError;
use crate::pipeline::timeline::Timeline;
use crate::schema::ContentBundle;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The video (and any shorts) were written.
    Completed(RunSummary),
    /// The document had no text, or generation produced no slides.
    /// Nothing was rendered or written apart from the checkpoint.
    NothingToGenerate,
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Completed(s) => Some(s),
            RunOutcome::NothingToGenerate => None,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub video_path: PathBuf,
    pub shorts: Vec<PathBuf>,
    pub checkpoint_path: Option<PathBuf>,
    pub chunks: usize,
    pub slides: usize,
    pub topic: String,
    pub units: Vec<UnitSummary>,
    pub total_duration_secs: f64,
    pub timings: StageTimings,
}

/// One timeline unit as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSummary {
    /// `intro`, `slide N` or `outro`.
    pub position: String,
    pub duration_secs: f64,
}

impl UnitSummary {
    pub fn from_timeline(timeline: &Timeline) -> Vec<Self> {
        timeline
            .units
            .iter()
            .map(|u| UnitSummary {
                position: u.position.to_string(),
                duration_secs: u.duration_secs,
            })
            .collect()
    }
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub extraction_ms: u64,
    pub generation_ms: u64,
    pub rendering_ms: u64,
    pub synthesis_ms: u64,
    pub encoding_ms: u64,
    pub shorts_ms: u64,
    pub total_ms: u64,
}

/// Write the per-chunk bundles as a pretty JSON array.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// half-written checkpoint.
pub async fn write_checkpoint(path: &Path, bundles: &[ContentBundle]) -> Result<(), PipelineError> {
    let write_err = |source| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(bundles)
        .map_err(|e| PipelineError::Internal(format!("checkpoint serialisation: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Checkpoint written: {} ({} chunks)", path.display(), bundles.len());
    Ok(())
}
