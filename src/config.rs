//! Configuration types for document-to-video runs.
//!
//! Two records control a run:
//!
//! * [`VideoConfig`] describes the video itself (theme, language, narration
//!   style, music, resolution, aspect ratio, animation level). It is built
//!   once from caller input and only read afterwards.
//! * [`PipelineConfig`] wraps a `VideoConfig` together with every knob of the
//!   pipeline machinery (chunk budget, model, retries, codecs, tool paths)
//!   and is built via [`PipelineConfigBuilder`].
//!
//! Both are threaded explicitly into each stage; nothing is read from
//! process-wide state after the config is built.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one document-to-video run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::{PipelineConfig, Theme, VideoConfig};
///
/// let config = PipelineConfig::builder()
///     .video(VideoConfig {
///         theme: Theme::Creative,
///         ..VideoConfig::default()
///     })
///     .chunk_chars(50_000)
///     .model("gpt-4.1")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// What the video should look and sound like.
    pub video: VideoConfig,

    /// Maximum characters per text chunk sent to the generation service. Default: 100 000.
    pub chunk_chars: usize,

    /// LLM model identifier. If None, uses `gpt-4.1`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for content generation. Default: 0.3.
    pub temperature: f32,

    /// Maximum output tokens per generation call. Default: 16 000.
    ///
    /// One chunk can yield a dozen slides, each with its own narration
    /// script, plus short-form segments; the JSON easily passes 8 000 tokens.
    pub max_tokens: usize,

    /// Retries on transient generation or synthesis failures. Default: 2.
    ///
    /// Malformed or schema-violating responses and alignment mismatches are
    /// never retried. 0 means every external call is attempted exactly once.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-generation-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Rasterisation DPI for rendered slides. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Output frame rate. Default: 24.
    pub fps: u32,

    /// ffmpeg video codec. Default: `libx264`.
    pub video_codec: String,

    /// ffmpeg audio codec. Default: `aac`.
    pub audio_codec: String,

    /// Audio bitrate. Default: `192k`.
    pub audio_bitrate: String,

    /// edge-tts voice name. Default: `en-GB-RyanNeural`.
    pub tts_voice: String,

    /// edge-tts speaking-rate adjustment. Default: `+30%`.
    pub speech_rate: String,

    /// Music track looped under the narration, if any.
    pub background_music: Option<PathBuf>,

    /// Directory receiving the video, checkpoint and shorts. Default: `Output`.
    pub output_dir: PathBuf,

    /// File name of the main video inside `output_dir`. Default: `final_video.mp4`.
    pub video_file_name: String,

    /// Write `chunk_results.json` after generation. Default: true.
    pub write_checkpoint: bool,

    /// Also produce one portrait short per generated segment. Default: false.
    pub shorts: bool,

    /// Locations of the external command-line tools.
    pub tools: ToolPaths,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            chunk_chars: 100_000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 16_000,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            dpi: 200,
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            tts_voice: "en-GB-RyanNeural".to_string(),
            speech_rate: "+30%".to_string(),
            background_music: None,
            output_dir: PathBuf::from("Output"),
            video_file_name: "final_video.mp4".to_string(),
            write_checkpoint: true,
            shorts: false,
            tools: ToolPaths::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("video", &self.video)
            .field("chunk_chars", &self.chunk_chars)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("dpi", &self.dpi)
            .field("fps", &self.fps)
            .field("video_codec", &self.video_codec)
            .field("audio_codec", &self.audio_codec)
            .field("audio_bitrate", &self.audio_bitrate)
            .field("tts_voice", &self.tts_voice)
            .field("background_music", &self.background_music)
            .field("output_dir", &self.output_dir)
            .field("shorts", &self.shorts)
            .field("tools", &self.tools)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the main output video.
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join(&self.video_file_name)
    }

    /// Full path of the generation checkpoint.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join("chunk_results.json")
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn video(mut self, video: VideoConfig) -> Self {
        self.config.video = video;
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = fps;
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.video_codec = codec.into();
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.audio_codec = codec.into();
        self
    }

    pub fn audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.config.audio_bitrate = bitrate.into();
        self
    }

    pub fn tts_voice(mut self, voice: impl Into<String>) -> Self {
        self.config.tts_voice = voice.into();
        self
    }

    pub fn speech_rate(mut self, rate: impl Into<String>) -> Self {
        self.config.speech_rate = rate.into();
        self
    }

    /// Mix `path` under the narration. Also sets `video.include_background_music`.
    pub fn background_music(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.background_music = Some(path.into());
        self.config.video.include_background_music = true;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn video_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.video_file_name = name.into();
        self
    }

    pub fn write_checkpoint(mut self, v: bool) -> Self {
        self.config.write_checkpoint = v;
        self
    }

    pub fn shorts(mut self, v: bool) -> Self {
        self.config.shorts = v;
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.chunk_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "Chunk size must be ≥ 1 character".into(),
            ));
        }
        if c.fps == 0 {
            return Err(PipelineError::InvalidConfig("Frame rate must be ≥ 1".into()));
        }
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.video_file_name.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Video file name must not be empty".into(),
            ));
        }
        if c.video.include_background_music && c.background_music.is_none() {
            return Err(PipelineError::InvalidConfig(
                "Background music is enabled but no music track was given".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Paths (or names on `$PATH`) of the external tools the pipeline drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub marp: PathBuf,
    pub edge_tts: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            marp: PathBuf::from("marp"),
            edge_tts: PathBuf::from("edge-tts"),
        }
    }
}

// ── Video configuration ──────────────────────────────────────────────────

/// Look and sound of the produced video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub theme: Theme,
    /// Presentation language code, e.g. `en`. Passed to the generation prompt.
    pub language: String,
    pub voice_style: VoiceStyle,
    pub include_background_music: bool,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    /// Recorded with the run; units are always joined with hard cuts.
    pub animation_level: AnimationLevel,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Professional,
            language: "en".to_string(),
            voice_style: VoiceStyle::Neutral,
            include_background_music: false,
            resolution: Resolution::P1080,
            aspect_ratio: AspectRatio::Landscape,
            animation_level: AnimationLevel::Moderate,
        }
    }
}

impl VideoConfig {
    /// Output frame size in pixels (width, height), both even.
    ///
    /// The resolution names the length of the short edge; the aspect ratio
    /// decides which edge that is.
    pub fn frame_size(&self) -> (u32, u32) {
        let short = self.resolution.short_edge();
        let (w, h) = self.aspect_ratio.ratio();
        let (width, height) = if w >= h {
            (short * w / h, short)
        } else {
            (short, short * h / w)
        };
        (width / 2 * 2, height / 2 * 2)
    }
}

/// Visual theme requested from the generation service.
///
/// Unknown names are kept rather than rejected; they fall back to the
/// professional descriptor in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Professional,
    Creative,
    Minimal,
    Unrecognized(String),
}

impl Theme {
    /// Parse a theme name. Never fails.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "professional" => Theme::Professional,
            "creative" => Theme::Creative,
            "minimal" => Theme::Minimal,
            _ => Theme::Unrecognized(name.to_string()),
        }
    }
}

/// Narration tone requested from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceStyle {
    Neutral,
    Enthusiastic,
    Formal,
    Unrecognized(String),
}

impl VoiceStyle {
    /// Parse a voice-style name. Never fails.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "neutral" => VoiceStyle::Neutral,
            "enthusiastic" => VoiceStyle::Enthusiastic,
            "formal" => VoiceStyle::Formal,
            _ => VoiceStyle::Unrecognized(name.to_string()),
        }
    }
}

/// Target resolution, named by the short edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    P720,
    #[default]
    P1080,
    P1440,
    P2160,
}

impl Resolution {
    pub fn short_edge(self) -> u32 {
        match self {
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
            Resolution::P1440 => 1440,
            Resolution::P2160 => 2160,
        }
    }

    /// Parse `720p`, `1080p`, `1440p`, `2160p`/`4k`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "720p" | "720" | "hd" => Some(Resolution::P720),
            "1080p" | "1080" | "fullhd" => Some(Resolution::P1080),
            "1440p" | "1440" => Some(Resolution::P1440),
            "2160p" | "2160" | "4k" => Some(Resolution::P2160),
            _ => None,
        }
    }
}

/// Frame aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9
    #[default]
    Landscape,
    /// 9:16, used for shorts.
    Portrait,
    /// 1:1
    Square,
    /// 4:3
    Classic,
}

impl AspectRatio {
    /// (width, height) ratio terms.
    pub fn ratio(self) -> (u32, u32) {
        match self {
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Square => (1, 1),
            AspectRatio::Classic => (4, 3),
        }
    }

    /// Parse `16:9`, `9:16`, `1:1`, `4:3`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "16:9" => Some(AspectRatio::Landscape),
            "9:16" => Some(AspectRatio::Portrait),
            "1:1" => Some(AspectRatio::Square),
            "4:3" => Some(AspectRatio::Classic),
            _ => None,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.ratio();
        write!(f, "{w}:{h}")
    }
}

/// Requested animation intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationLevel {
    None,
    Subtle,
    #[default]
    Moderate,
    Dynamic,
}

impl AnimationLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(AnimationLevel::None),
            "subtle" => Some(AnimationLevel::Subtle),
            "moderate" => Some(AnimationLevel::Moderate),
            "dynamic" => Some(AnimationLevel::Dynamic),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let c = PipelineConfig::default();
        assert_eq!(c.fps, 24);
        assert_eq!(c.video_codec, "libx264");
        assert_eq!(c.audio_codec, "aac");
        assert_eq!(c.audio_bitrate, "192k");
        assert_eq!(c.chunk_chars, 100_000);
        assert_eq!(c.video_path(), PathBuf::from("Output/final_video.mp4"));
    }

    #[test]
    fn builder_rejects_zero_chunk_size() {
        let err = PipelineConfig::builder().chunk_chars(0).build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps_dpi_and_temperature() {
        let c = PipelineConfig::builder()
            .dpi(10)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn background_music_sets_flag() {
        let c = PipelineConfig::builder()
            .background_music("music.mp3")
            .build()
            .unwrap();
        assert!(c.video.include_background_music);
        assert_eq!(c.background_music, Some(PathBuf::from("music.mp3")));
    }

    #[test]
    fn music_flag_without_track_is_rejected() {
        let mut video = VideoConfig::default();
        video.include_background_music = true;
        assert!(PipelineConfig::builder().video(video).build().is_err());
    }

    #[test]
    fn unknown_theme_and_voice_are_kept() {
        assert_eq!(Theme::from_name("Creative"), Theme::Creative);
        assert_eq!(
            Theme::from_name("neon"),
            Theme::Unrecognized("neon".to_string())
        );
        assert_eq!(VoiceStyle::from_name("formal"), VoiceStyle::Formal);
        assert!(matches!(
            VoiceStyle::from_name("whisper"),
            VoiceStyle::Unrecognized(_)
        ));
    }

    #[test]
    fn frame_size_follows_aspect_ratio() {
        let mut v = VideoConfig::default();
        assert_eq!(v.frame_size(), (1920, 1080));
        v.aspect_ratio = AspectRatio::Portrait;
        assert_eq!(v.frame_size(), (1080, 1920));
        v.aspect_ratio = AspectRatio::Square;
        v.resolution = Resolution::P720;
        assert_eq!(v.frame_size(), (720, 720));
        v.aspect_ratio = AspectRatio::Classic;
        assert_eq!(v.frame_size(), (960, 720));
    }

    #[test]
    fn parse_names() {
        assert_eq!(Resolution::from_name("4k"), Some(Resolution::P2160));
        assert_eq!(Resolution::from_name("8k"), None);
        assert_eq!(AspectRatio::from_name("9:16"), Some(AspectRatio::Portrait));
        assert_eq!(AspectRatio::Portrait.to_string(), "9:16");
        assert_eq!(AnimationLevel::from_name("Dynamic"), Some(AnimationLevel::Dynamic));
    }
}
