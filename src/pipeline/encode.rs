//! Video encoding: one ffmpeg invocation per timeline.
//!
//! Every unit contributes a still image looped for exactly its duration and
//! its narration clip. A single `concat` filter joins the units with hard
//! cuts, so the output length is the sum of the unit durations. Optional
//! background music is looped and mixed under the narration.
//!
//! ## Atomic output
//!
//! [`write_video`] encodes to a hidden sibling file and renames it into
//! place only after ffmpeg succeeds. A failed run never leaves a truncated
//! video behind.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::run_tool;
use crate::pipeline::timeline::Timeline;
use crate::services::VideoEncoder;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Volume applied to background music under the narration.
const MUSIC_VOLUME: f32 = 0.1;

/// Output format knobs for one encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub width: u32,
    pub height: u32,
    pub background_music: Option<PathBuf>,
    /// Cut the output at this length.
    pub max_duration_secs: Option<f64>,
}

impl EncodeSettings {
    /// Settings for the main video of a run.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let (width, height) = config.video.frame_size();
        Self {
            fps: config.fps,
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            width,
            height,
            background_music: if config.video.include_background_music {
                config.background_music.clone()
            } else {
                None
            },
            max_duration_secs: None,
        }
    }
}

/// [`VideoEncoder`] that drives the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(
        &self,
        timeline: &Timeline,
        settings: &EncodeSettings,
        output: &Path,
    ) -> Result<(), String> {
        let args = ffmpeg_args(timeline, settings, output);
        debug!("ffmpeg with {} arguments → {}", args.len(), output.display());
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        run_tool(&mut cmd, "ffmpeg").await?;
        Ok(())
    }
}

/// Full ffmpeg argument list for `timeline`.
pub fn ffmpeg_args(timeline: &Timeline, settings: &EncodeSettings, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into()];

    for unit in &timeline.units {
        args.extend([
            "-loop".into(),
            "1".into(),
            "-t".into(),
            unit.duration_secs.to_string().into(),
            "-i".into(),
            unit.image.clone().into_os_string(),
            "-i".into(),
            unit.audio.clone().into_os_string(),
        ]);
    }

    let n = timeline.units.len();
    if let Some(ref music) = settings.background_music {
        args.extend([
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            music.clone().into_os_string(),
        ]);
    }

    args.push("-filter_complex".into());
    args.push(filter_graph(n, settings).into());

    let audio_label = if settings.background_music.is_some() {
        "[amix]"
    } else {
        "[aout]"
    };
    let output_opts: [OsString; 16] = [
        "-map".into(),
        "[vout]".into(),
        "-map".into(),
        audio_label.into(),
        "-c:v".into(),
        settings.video_codec.clone().into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-r".into(),
        settings.fps.to_string().into(),
        "-c:a".into(),
        settings.audio_codec.clone().into(),
        "-b:a".into(),
        settings.audio_bitrate.clone().into(),
        "-movflags".into(),
        "+faststart".into(),
    ];
    args.extend(output_opts);

    if let Some(max) = settings.max_duration_secs {
        args.push("-t".into());
        args.push(max.to_string().into());
    }

    args.push(output.as_os_str().to_os_string());
    args
}

/// `filter_complex` graph for `n` units (input `2i` = image, `2i + 1` = audio).
pub fn filter_graph(n: usize, settings: &EncodeSettings) -> String {
    let (w, h, fps) = (settings.width, settings.height, settings.fps);
    let mut graph = String::new();

    for i in 0..n {
        let _ = write!(
            graph,
            "[{v}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p,fps={fps}[v{i}];\
             [{a}:a]aresample=44100,aformat=channel_layouts=stereo[a{i}];",
            v = 2 * i,
            a = 2 * i + 1,
        );
    }
    for i in 0..n {
        let _ = write!(graph, "[v{i}][a{i}]");
    }
    let _ = write!(graph, "concat=n={n}:v=1:a=1[vout][aout]");

    if settings.background_music.is_some() {
        let _ = write!(
            graph,
            ";[{m}:a]volume={MUSIC_VOLUME}[bg];[aout][bg]amix=inputs=2:duration=first:dropout_transition=0[amix]",
            m = 2 * n,
        );
    }
    graph
}

/// Hidden sibling path the encoder writes to before the final rename.
pub fn partial_path(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    dest.with_file_name(format!(".{stem}.partial.mp4"))
}

/// Encode `timeline` to `dest` atomically.
///
/// # Errors
/// * [`PipelineError::OutputWriteFailed`] when the directory cannot be
///   created or the final rename fails.
/// * [`PipelineError::Encoding`] when the encoder fails; nothing is left at
///   `dest` and the partial file is removed.
pub async fn write_video(
    encoder: &dyn VideoEncoder,
    timeline: &Timeline,
    settings: &EncodeSettings,
    dest: &Path,
) -> Result<(), PipelineError> {
    if timeline.is_empty() {
        return Err(PipelineError::Encoding {
            path: dest.to_path_buf(),
            detail: "timeline has no units".to_string(),
        });
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let partial = partial_path(dest);
    if let Err(detail) = encoder.encode(timeline, settings, &partial).await {
        remove_partial(&partial).await;
        return Err(PipelineError::Encoding {
            path: dest.to_path_buf(),
            detail,
        });
    }

    if !partial.exists() {
        return Err(PipelineError::Encoding {
            path: dest.to_path_buf(),
            detail: "encoder reported success but wrote no file".to_string(),
        });
    }

    tokio::fs::rename(&partial, dest).await.map_err(|e| {
        PipelineError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        }
    })?;

    info!(
        "Wrote {} ({} units, {:.2}s)",
        dest.display(),
        timeline.len(),
        timeline.total_duration_secs()
    );
    Ok(())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::timeline::{TimelineUnit, UnitPosition};

    fn settings() -> EncodeSettings {
        EncodeSettings::from_config(&PipelineConfig::default())
    }

    fn timeline(durations: &[f64]) -> Timeline {
        Timeline {
            units: durations
                .iter()
                .enumerate()
                .map(|(i, d)| TimelineUnit {
                    position: UnitPosition::Slide(i),
                    image: PathBuf::from(format!("slide_{i}.png")),
                    audio: PathBuf::from(format!("unit_{i:03}.mp3")),
                    duration_secs: *d,
                })
                .collect(),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn settings_defaults() {
        let s = settings();
        assert_eq!((s.width, s.height, s.fps), (1920, 1080, 24));
        assert_eq!(s.video_codec, "libx264");
        assert!(s.background_music.is_none());
    }

    #[test]
    fn each_image_is_bound_to_its_duration() {
        let args = strings(&ffmpeg_args(&timeline(&[4.0, 6.2]), &settings(), Path::new("out.mp4")));
        let joined = args.join(" ");
        assert!(joined.contains("-loop 1 -t 4 -i slide_0.png -i unit_000.mp3"), "{joined}");
        assert!(joined.contains("-loop 1 -t 6.2 -i slide_1.png -i unit_001.mp3"), "{joined}");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac -b:a 192k"));
        assert!(joined.contains("-r 24"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn filter_concatenates_in_order() {
        let g = filter_graph(3, &settings());
        assert!(g.contains("[v0][a0][v1][a1][v2][a2]concat=n=3:v=1:a=1[vout][aout]"));
        assert!(g.contains("[4:v]scale=1920:1080"));
        assert!(g.contains("[5:a]aresample"));
        assert!(!g.contains("amix"));
    }

    #[test]
    fn music_is_mixed_under_narration() {
        let mut s = settings();
        s.background_music = Some(PathBuf::from("bed.mp3"));
        let g = filter_graph(2, &s);
        assert!(g.contains("[4:a]volume=0.1[bg]"));
        assert!(g.contains("[aout][bg]amix=inputs=2:duration=first"));
        let args = strings(&ffmpeg_args(&timeline(&[1.0, 2.0]), &s, Path::new("o.mp4")));
        assert!(args.join(" ").contains("-stream_loop -1 -i bed.mp3"));
        assert!(args.contains(&"[amix]".to_string()));
    }

    #[test]
    fn max_duration_caps_output() {
        let mut s = settings();
        s.max_duration_secs = Some(60.0);
        let args = strings(&ffmpeg_args(&timeline(&[90.0]), &s, Path::new("short.mp4")));
        let n = args.len();
        assert_eq!(&args[n - 3..], ["-t", "60", "short.mp4"]);
    }

    #[test]
    fn partial_path_is_hidden_sibling() {
        assert_eq!(
            partial_path(Path::new("Output/final_video.mp4")),
            PathBuf::from("Output/.final_video.partial.mp4")
        );
    }

    /// Writes part of the output, then fails.
    struct HalfWrite;

    #[async_trait]
    impl VideoEncoder for HalfWrite {
        async fn encode(&self, _: &Timeline, _: &EncodeSettings, output: &Path) -> Result<(), String> {
            std::fs::write(output, b"partial").map_err(|e| e.to_string())?;
            Err("disk full".to_string())
        }
    }

    #[tokio::test]
    async fn failed_encode_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Output/final_video.mp4");

        let err = write_video(&HalfWrite, &timeline(&[1.0]), &settings(), &dest)
            .await
            .unwrap_err();

        match err {
            PipelineError::Encoding { ref path, ref detail } => {
                assert_eq!(path, &dest);
                assert_eq!(detail, "disk full");
            }
            other => panic!("expected Encoding, got {other:?}"),
        }
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
