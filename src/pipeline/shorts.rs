//! Short-form videos: one portrait clip per generated segment.
//!
//! Each segment gets a one-slide portrait deck, its own narration and a
//! one-unit timeline. The encode is capped at the segment's target length,
//! so a narration that runs long is cut rather than stretching the clip.

use crate::config::{AspectRatio, PipelineConfig, VideoConfig};
use crate::error::PipelineError;
use crate::pipeline::deck::build_short_deck;
use crate::pipeline::encode::{write_video, EncodeSettings};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::timeline::TimelineAssembler;
use crate::schema::{ShortSegment, ThemeColors};
use crate::services::Services;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output path of short number `n` (1-based).
pub fn short_video_path(output_dir: &Path, n: usize) -> PathBuf {
    output_dir.join("shorts").join(format!("short_video_{n}.mp4"))
}

/// Render, narrate and encode every segment, in order.
///
/// Returns the written paths. The first failure aborts the remaining shorts.
pub async fn produce_shorts(
    segments: &[ShortSegment],
    theme: &ThemeColors,
    config: &PipelineConfig,
    services: &Services,
    workspace: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let portrait = VideoConfig {
        aspect_ratio: AspectRatio::Portrait,
        ..config.video.clone()
    };
    let (width, height) = portrait.frame_size();

    let mut written = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let n = i + 1;
        let label = format!("short {n}");
        let dir = workspace.join(format!("short_{n}"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;

        let deck = build_short_deck(segment, theme, &portrait);
        let images = services
            .renderer
            .render(&deck, &dir)
            .await
            .map_err(|detail| PipelineError::Rendering {
                detail: format!("{label}: {detail}"),
            })?;
        let image = match images.as_slice() {
            [image] => image,
            other => {
                return Err(PipelineError::Alignment {
                    expected: 1,
                    actual: other.len(),
                })
            }
        };

        let timeline = TimelineAssembler::new(
            services.synthesizer.clone(),
            services.probe.clone(),
            &dir,
        )
        .with_retry(RetryPolicy::from_config(config))
        .assemble_single(&label, image, &segment.script)
        .await?;

        let settings = EncodeSettings {
            width,
            height,
            max_duration_secs: Some(segment.duration_secs),
            ..EncodeSettings::from_config(config)
        };
        let dest = short_video_path(&config.output_dir, n);
        write_video(services.encoder.as_ref(), &timeline, &settings, &dest).await?;

        info!("{}: '{}' → {}", label, segment.title, dest.display());
        written.push(dest);
    }
    Ok(written)
}
