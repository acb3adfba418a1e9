//! CLI binary for edgequake-pdf2video.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2video::{
    convert, convert_topic, AnimationLevel, AspectRatio, PipelineConfig, PipelineError,
    PipelineProgressCallback, ProgressCallback, Resolution, RunOutcome, Stage, Theme, ToolPaths,
    VideoConfig, VoiceStyle,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while chunks are generated, then a
/// bar over timeline units once the narration plan is known.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the chunk currently being generated.
    chunk_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_units_planned` supplies a length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} units  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Narrating");
        self.bar.reset_eta();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, text_chars: usize, chunk_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{text_chars} chars of source text, {chunk_count} chunk(s) to generate…"
            ))
        ));
    }

    fn on_stage(&self, stage: Stage) {
        // The units bar owns the prefix during synthesis.
        if stage != Stage::Synthesis {
            self.bar.set_prefix(stage.as_str().to_string());
        }
        self.bar.set_message(String::new());
    }

    fn on_chunk_start(&self, chunk: usize, total: usize) {
        if let Ok(mut started) = self.chunk_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {}/{}", chunk + 1, total));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, slides: usize) {
        let elapsed_ms = self
            .chunk_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            chunk + 1,
            total,
            dim(&format!("{slides:>3} slides")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_units_planned(&self, total: usize) {
        self.activate_bar(total);
    }

    fn on_unit_complete(&self, position: usize, total: usize, duration_secs: f64) {
        let label = if position == 0 {
            "intro".to_string()
        } else if position + 1 == total {
            "outro".to_string()
        } else {
            format!("slide {position}")
        };
        self.bar.println(format!(
            "  {} {:<10}  {}",
            green("✓"),
            label,
            dim(&format!("{duration_secs:>6.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, units: usize, total_duration_secs: f64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} units narrated  ({:.1}s of video)",
            green("✔"),
            bold(&units.to_string()),
            total_duration_secs,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic run (writes Output/final_video.mp4)
  pdf2video paper.pdf

  # Different output directory, portrait 720p
  pdf2video paper.pdf -o out --aspect-ratio 9:16 --resolution 720p

  # From a URL, with short-form clips
  pdf2video https://arxiv.org/pdf/1706.03762 --shorts

  # No document: a video about a topic
  pdf2video --topic "Introduction to transformers"

  # Background music under the narration
  pdf2video paper.pdf --music ambient.mp3

  # Machine-readable summary
  pdf2video --json paper.pdf > run.json

OUTPUT:
  <DIR>/final_video.mp4         the narrated video
  <DIR>/chunk_results.json      generated slides per chunk (unless --no-checkpoint)
  <DIR>/shorts/short_video_N.mp4  with --shorts

EXTERNAL TOOLS (on $PATH, or set with the flags below):
  marp        slide rendering           npm i -g @marp-team/marp-cli
  edge-tts    narration                 pip install edge-tts
  ffmpeg      encoding
  ffprobe     narration length

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Turn PDF documents into narrated explainer videos.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2video",
    version,
    about = "Turn PDF documents into narrated explainer videos",
    long_about = "Turn a PDF (local file or URL) into a narrated slide video. An LLM writes the \
slides and a narration script per slide; every slide stays on screen for exactly as long as its \
narration plays.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL (a topic with --topic).
    input: String,

    /// Treat INPUT as a topic instead of a document.
    #[arg(long, env = "PDF2VIDEO_TOPIC")]
    topic: bool,

    /// Output directory.
    #[arg(short, long, env = "PDF2VIDEO_OUTPUT_DIR", default_value = "Output")]
    output: PathBuf,

    /// Visual theme: professional, creative, minimal.
    #[arg(long, env = "PDF2VIDEO_THEME", default_value = "professional")]
    theme: String,

    /// Narration style: neutral, enthusiastic, formal.
    #[arg(long, env = "PDF2VIDEO_VOICE_STYLE", default_value = "neutral")]
    voice_style: String,

    /// Presentation language code.
    #[arg(long, env = "PDF2VIDEO_LANGUAGE", default_value = "en")]
    language: String,

    /// Background music file mixed under the narration.
    #[arg(long, env = "PDF2VIDEO_MUSIC")]
    music: Option<PathBuf>,

    /// Aspect ratio: 16:9, 9:16, 1:1, 4:3.
    #[arg(long, env = "PDF2VIDEO_ASPECT_RATIO", default_value = "16:9")]
    aspect_ratio: String,

    /// Resolution: 720p, 1080p, 1440p, 2160p.
    #[arg(long, env = "PDF2VIDEO_RESOLUTION", default_value = "1080p")]
    resolution: String,

    /// Animation level: none, subtle, moderate, dynamic.
    #[arg(long, env = "PDF2VIDEO_ANIMATION", default_value = "moderate")]
    animation: String,

    /// LLM model ID (e.g. gpt-4.1, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "PDF2VIDEO_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "PDF2VIDEO_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Maximum characters of source text per generation call.
    #[arg(long, env = "PDF2VIDEO_CHUNK_CHARS", default_value_t = 100_000)]
    chunk_chars: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2VIDEO_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per chunk.
    #[arg(long, env = "PDF2VIDEO_MAX_TOKENS", default_value_t = 16_000)]
    max_tokens: usize,

    /// Retries per generation or synthesis call.
    #[arg(long, env = "PDF2VIDEO_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Slide rasterisation DPI (72–400).
    #[arg(long, env = "PDF2VIDEO_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// edge-tts voice name.
    #[arg(long, env = "PDF2VIDEO_TTS_VOICE", default_value = "en-GB-RyanNeural")]
    tts_voice: String,

    /// edge-tts speaking rate, e.g. +30% or -10%.
    #[arg(long, env = "PDF2VIDEO_SPEECH_RATE", default_value = "+30%", allow_hyphen_values = true)]
    speech_rate: String,

    /// Also render one portrait short per generated segment.
    #[arg(long, env = "PDF2VIDEO_SHORTS")]
    shorts: bool,

    /// Do not write chunk_results.json.
    #[arg(long, env = "PDF2VIDEO_NO_CHECKPOINT")]
    no_checkpoint: bool,

    /// ffmpeg executable.
    #[arg(long, env = "PDF2VIDEO_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, env = "PDF2VIDEO_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// marp executable.
    #[arg(long, env = "PDF2VIDEO_MARP", default_value = "marp")]
    marp: PathBuf,

    /// edge-tts executable.
    #[arg(long, env = "PDF2VIDEO_EDGE_TTS", default_value = "edge-tts")]
    edge_tts: PathBuf,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDF2VIDEO_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2VIDEO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2VIDEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2VIDEO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback that matters; keep library
    // logs at error level while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PipelineError>() {
                Some(pe) => eprintln!("{} {} failed: {pe}", red("✘"), pe.stage()),
                None => eprintln!("{} {err:#}", red("✘")),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb)?;

    // Pipeline errors are returned unwrapped so `main` can name the stage.
    let outcome = if cli.topic {
        convert_topic(&cli.input, &config).await?
    } else {
        convert(&cli.input, &config).await?
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise summary")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    match outcome {
        RunOutcome::Completed(summary) => {
            eprintln!(
                "{}  {} slides  {:.1}s  {}ms  →  {}",
                green("✔"),
                summary.slides,
                summary.total_duration_secs,
                summary.timings.total_ms,
                bold(&summary.video_path.display().to_string()),
            );
            for short in &summary.shorts {
                eprintln!("   {} {}", dim("short"), short.display());
            }
            if let Some(ref checkpoint) = summary.checkpoint_path {
                eprintln!("   {} {}", dim("checkpoint"), checkpoint.display());
            }
        }
        RunOutcome::NothingToGenerate => {
            eprintln!(
                "{} nothing to generate: the document has no extractable text",
                cyan("⚠")
            );
        }
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let video = VideoConfig {
        theme: Theme::from_name(&cli.theme),
        language: cli.language.clone(),
        voice_style: VoiceStyle::from_name(&cli.voice_style),
        include_background_music: cli.music.is_some(),
        resolution: Resolution::from_name(&cli.resolution)
            .with_context(|| format!("Unknown resolution '{}'", cli.resolution))?,
        aspect_ratio: AspectRatio::from_name(&cli.aspect_ratio)
            .with_context(|| format!("Unknown aspect ratio '{}'", cli.aspect_ratio))?,
        animation_level: AnimationLevel::from_name(&cli.animation)
            .with_context(|| format!("Unknown animation level '{}'", cli.animation))?,
    };

    let mut builder = PipelineConfig::builder()
        .video(video)
        .output_dir(cli.output.clone())
        .chunk_chars(cli.chunk_chars)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .dpi(cli.dpi)
        .tts_voice(cli.tts_voice.clone())
        .speech_rate(cli.speech_rate.clone())
        .shorts(cli.shorts)
        .write_checkpoint(!cli.no_checkpoint)
        .tools(ToolPaths {
            ffmpeg: cli.ffmpeg.clone(),
            ffprobe: cli.ffprobe.clone(),
            marp: cli.marp.clone(),
            edge_tts: cli.edge_tts.clone(),
        });

    if let Some(ref music) = cli.music {
        builder = builder.background_music(music.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
