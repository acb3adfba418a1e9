//! Run entry points: document in, narrated video out.
//!
//! ## Stage order
//!
//! A run is strictly sequential and fail-fast. Each stage starts only after
//! the previous one has fully succeeded; the first failure ends the run with
//! a [`PipelineError`] naming the stage and the chunk or unit involved.
//!
//! ```text
//! resolve ─▶ extract ─▶ chunk ─▶ generate ─▶ checkpoint ─▶ normalise
//!        ─▶ render ─▶ align ─▶ narrate ─▶ encode ─▶ shorts
//! ```
//!
//! Intermediate files (deck, slide images, narration clips) live in a
//! scoped temp directory that is removed when the run ends, whether it
//! succeeded or not.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{write_checkpoint, RunOutcome, RunSummary, StageTimings, UnitSummary};
use crate::pipeline::chunk::Chunker;
use crate::pipeline::deck::build_deck;
use crate::pipeline::encode::{write_video, EncodeSettings};
use crate::pipeline::generate::{ContentGenerator, GenerationSource};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::shorts::produce_shorts;
use crate::pipeline::timeline::{check_alignment, TimelineAssembler};
use crate::pipeline::input;
use crate::progress::Stage;
use crate::prompts::{intro_narration, OUTRO_NARRATION};
use crate::schema::{ContentBundle, GeneratedContent};
use crate::services::Services;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Convert a PDF file or URL into a narrated video.
///
/// This is the primary entry point for the library. It resolves the LLM
/// provider from `config` and the environment and drives the production
/// tools (pdfium, marp, edge-tts, ffprobe, ffmpeg).
///
/// # Returns
/// * `Ok(RunOutcome::Completed(_))` with output paths and unit durations.
/// * `Ok(RunOutcome::NothingToGenerate)` when the document has no text or
///   generation produced no slides.
///
/// # Errors
/// Any stage failure. No video is written in that case.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutcome, PipelineError> {
    let provider = resolve_provider(config).await?;
    let services = Services::production(config, provider);
    convert_with(input_str, config, &services).await
}

/// Like [`convert`], with caller-supplied collaborators.
pub async fn convert_with(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
    services: &Services,
) -> Result<RunOutcome, PipelineError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let progress = config.progress_callback.as_ref();
    let stage = |s: Stage| {
        if let Some(cb) = progress {
            cb.on_stage(s);
        }
    };
    let mut timings = StageTimings::default();
    info!("Starting run: {}", input_str);

    // ── Step 1: Resolve input and extract text ───────────────────────────
    stage(Stage::Extraction);
    let started = Instant::now();
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();
    let text = services
        .extractor
        .extract(&pdf_path)
        .await
        .map_err(|detail| PipelineError::Extraction {
            path: pdf_path.clone(),
            detail,
        })?;
    drop(resolved);
    timings.extraction_ms = started.elapsed().as_millis() as u64;

    if text.trim().is_empty() {
        info!("Document has no extractable text; nothing to generate");
        return Ok(RunOutcome::NothingToGenerate);
    }

    // ── Step 2: Chunk ────────────────────────────────────────────────────
    let chunker = Chunker::new(&text, config.chunk_chars);
    let chunks: Vec<_> = chunker.chunks().filter(|c| !c.is_blank()).collect();
    info!(
        "Extracted {} chars → {} chunk(s) of ≤ {} chars",
        text.chars().count(),
        chunks.len(),
        chunker.max_chars()
    );
    if let Some(cb) = progress {
        cb.on_run_start(text.chars().count(), chunks.len());
    }
    if chunks.is_empty() {
        return Ok(RunOutcome::NothingToGenerate);
    }

    // ── Step 3: Generate, one chunk at a time ────────────────────────────
    stage(Stage::Generation);
    let started = Instant::now();
    let generator = ContentGenerator::new(Arc::clone(&services.backend), config);
    let total_chunks = chunks.len();
    let mut bundles = Vec::with_capacity(total_chunks);
    for (pos, chunk) in chunks.iter().enumerate() {
        if let Some(cb) = progress {
            cb.on_chunk_start(pos, total_chunks);
        }
        let bundle = generator
            .generate(GenerationSource::Chunk(chunk.text), &config.video)
            .await
            .map_err(|source| PipelineError::Generation {
                chunk: chunk.index,
                source,
            })?;
        info!(
            "Chunk {}/{}: {} slide(s), {} short segment(s)",
            pos + 1,
            total_chunks,
            bundle.slides.len(),
            bundle.short_segments.len()
        );
        if let Some(cb) = progress {
            cb.on_chunk_complete(pos, total_chunks, bundle.slides.len());
        }
        bundles.push(bundle);
    }
    timings.generation_ms = started.elapsed().as_millis() as u64;

    let checkpoint_path = checkpoint(config, &bundles).await?;
    let content = if bundles.len() == 1 {
        GeneratedContent::Bundle(bundles.remove(0))
    } else {
        GeneratedContent::Chunked(bundles)
    };

    produce(content, total_chunks, checkpoint_path, config, services, timings, total_start).await
}

/// Narrated video about `topic`, with no source document.
///
/// One generation call replaces extraction and chunking; every later stage
/// is the same as for [`convert_with`].
pub async fn convert_topic_with(
    topic: &str,
    config: &PipelineConfig,
    services: &Services,
) -> Result<RunOutcome, PipelineError> {
    let total_start = Instant::now();
    let mut timings = StageTimings::default();
    if topic.trim().is_empty() {
        return Ok(RunOutcome::NothingToGenerate);
    }
    info!("Starting topic run: {}", topic);

    if let Some(cb) = &config.progress_callback {
        cb.on_run_start(0, 1);
        cb.on_stage(Stage::Generation);
        cb.on_chunk_start(0, 1);
    }
    let started = Instant::now();
    let bundle = ContentGenerator::new(Arc::clone(&services.backend), config)
        .generate(GenerationSource::Topic(topic.trim()), &config.video)
        .await
        .map_err(|source| PipelineError::Generation { chunk: 0, source })?;
    if let Some(cb) = &config.progress_callback {
        cb.on_chunk_complete(0, 1, bundle.slides.len());
    }
    timings.generation_ms = started.elapsed().as_millis() as u64;

    let checkpoint_path = checkpoint(config, std::slice::from_ref(&bundle)).await?;
    produce(
        GeneratedContent::Bundle(bundle),
        1,
        checkpoint_path,
        config,
        services,
        timings,
        total_start,
    )
    .await
}

/// Topic-mode counterpart of [`convert`].
pub async fn convert_topic(topic: &str, config: &PipelineConfig) -> Result<RunOutcome, PipelineError> {
    let provider = resolve_provider(config).await?;
    let services = Services::production(config, provider);
    convert_topic_with(topic, config, &services).await
}

/// Write `chunk_results.json` when enabled.
async fn checkpoint(
    config: &PipelineConfig,
    bundles: &[ContentBundle],
) -> Result<Option<PathBuf>, PipelineError> {
    if !config.write_checkpoint {
        return Ok(None);
    }
    let path = config.checkpoint_path();
    write_checkpoint(&path, bundles).await?;
    Ok(Some(path))
}

/// Everything after generation: normalise, render, narrate, encode, shorts.
async fn produce(
    content: GeneratedContent,
    chunks: usize,
    checkpoint_path: Option<PathBuf>,
    config: &PipelineConfig,
    services: &Services,
    mut timings: StageTimings,
    total_start: Instant,
) -> Result<RunOutcome, PipelineError> {
    let progress = config.progress_callback.as_ref();
    let stage = |s: Stage| {
        if let Some(cb) = progress {
            cb.on_stage(s);
        }
    };

    // ── Step 5: Normalise ────────────────────────────────────────────────
    let presentation = content.into_presentation();
    if presentation.slides.is_empty() {
        info!("Generation produced no slides; nothing to render");
        return Ok(RunOutcome::NothingToGenerate);
    }
    info!(
        "Presentation '{}': {} slide(s), {} short segment(s)",
        presentation.topic,
        presentation.slides.len(),
        presentation.segments.len()
    );

    // ── Step 6: Scoped workspace ─────────────────────────────────────────
    let workspace = TempDir::new().map_err(|e| PipelineError::Internal(format!("tempdir: {e}")))?;
    debug!("Workspace: {}", workspace.path().display());

    // ── Step 7: Render and check alignment ───────────────────────────────
    stage(Stage::Rendering);
    let started = Instant::now();
    let deck = build_deck(&presentation, &config.video);
    let images = services
        .renderer
        .render(&deck, workspace.path())
        .await
        .map_err(|detail| PipelineError::Rendering { detail })?;
    check_alignment(presentation.slides.len(), images.len())?;
    timings.rendering_ms = started.elapsed().as_millis() as u64;

    // ── Step 8: Narrate and assemble ─────────────────────────────────────
    stage(Stage::Synthesis);
    let started = Instant::now();
    let timeline = TimelineAssembler::new(
        Arc::clone(&services.synthesizer),
        Arc::clone(&services.probe),
        workspace.path(),
    )
    .with_retry(RetryPolicy::from_config(config))
    .with_progress(config.progress_callback.clone())
    .assemble(
        &presentation.slides,
        &images,
        &intro_narration(&presentation.topic),
        OUTRO_NARRATION,
    )
    .await?;
    timings.synthesis_ms = started.elapsed().as_millis() as u64;

    // ── Step 9: Encode ───────────────────────────────────────────────────
    stage(Stage::Encoding);
    let started = Instant::now();
    let video_path = config.video_path();
    let settings = EncodeSettings::from_config(config);
    write_video(services.encoder.as_ref(), &timeline, &settings, &video_path).await?;
    timings.encoding_ms = started.elapsed().as_millis() as u64;

    // ── Step 10: Shorts ──────────────────────────────────────────────────
    let shorts = if config.shorts && !presentation.segments.is_empty() {
        stage(Stage::Shorts);
        let started = Instant::now();
        let written = produce_shorts(
            &presentation.segments,
            &presentation.theme,
            config,
            services,
            workspace.path(),
        )
        .await?;
        timings.shorts_ms = started.elapsed().as_millis() as u64;
        written
    } else {
        Vec::new()
    };

    timings.total_ms = total_start.elapsed().as_millis() as u64;
    let total_duration_secs = timeline.total_duration_secs();
    if let Some(cb) = progress {
        cb.on_run_complete(timeline.len(), total_duration_secs);
    }
    info!(
        "Run complete: {} ({} units, {:.2}s) in {}ms",
        video_path.display(),
        timeline.len(),
        total_duration_secs,
        timings.total_ms
    );

    Ok(RunOutcome::Completed(RunSummary {
        video_path,
        shorts,
        checkpoint_path,
        chunks,
        slides: presentation.slides.len(),
        topic: presentation.topic,
        units: UnitSummary::from_timeline(&timeline),
        total_duration_secs,
        timings,
    }))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutcome, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both set and non-empty.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub async fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
