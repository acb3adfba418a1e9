//! Timeline assembly: pair each rendered slide image with its narration and
//! bind it to the narration's measured length.
//!
//! ## Why the audio decides the duration
//!
//! The probed length of the synthesized clip is the only duration a unit
//! ever gets. Nothing is estimated from word counts or configured per slide,
//! so picture and voice can never drift apart, whatever speaking rate the
//! synthesizer used.
//!
//! ## Unit order
//!
//! ```text
//! position 0       1 .. n        n + 1
//!          intro   slide 0..n-1  outro
//! image    title   slide i       closing
//! ```
//!
//! The image list must therefore have exactly `n + 2` entries. That is
//! checked before any audio is synthesized.

use crate::error::PipelineError;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use crate::schema::SlideContent;
use crate::services::{AudioProbe, Synthesizer};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a unit sits in the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitPosition {
    Intro,
    /// 0-based index into the flattened slides.
    Slide(usize),
    Outro,
}

impl fmt::Display for UnitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitPosition::Intro => write!(f, "intro"),
            UnitPosition::Slide(i) => write!(f, "slide {}", i + 1),
            UnitPosition::Outro => write!(f, "outro"),
        }
    }
}

/// One image shown for exactly as long as its narration plays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineUnit {
    pub position: UnitPosition,
    pub image: PathBuf,
    pub audio: PathBuf,
    /// Probed duration of `audio`, unmodified.
    pub duration_secs: f64,
}

/// Ordered units: intro, slides in generation order, outro.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub units: Vec<TimelineUnit>,
}

impl Timeline {
    pub fn total_duration_secs(&self) -> f64 {
        self.units.iter().map(|u| u.duration_secs).sum()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// `Ok` when there is one image per slide plus title and closing images.
pub fn check_alignment(slides: usize, images: usize) -> Result<(), PipelineError> {
    let expected = slides + 2;
    if images == expected {
        Ok(())
    } else {
        Err(PipelineError::Alignment {
            expected,
            actual: images,
        })
    }
}

/// Builds a [`Timeline`] unit by unit, strictly in order.
pub struct TimelineAssembler {
    synthesizer: Arc<dyn Synthesizer>,
    probe: Arc<dyn AudioProbe>,
    workspace: PathBuf,
    policy: RetryPolicy,
    progress: Option<ProgressCallback>,
}

impl TimelineAssembler {
    /// Audio files are written into `workspace` as `unit_{pos:03}.mp3`.
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        probe: Arc<dyn AudioProbe>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            probe,
            workspace: workspace.into(),
            policy: RetryPolicy::new(0, 0),
            progress: None,
        }
    }

    /// Retry failed synthesis calls.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Assemble the timeline for `slides` shown on `images`.
    ///
    /// # Errors
    /// * [`PipelineError::Alignment`] when `images.len() != slides.len() + 2`,
    ///   before anything is synthesized.
    /// * [`PipelineError::Synthesis`] naming the first unit whose narration
    ///   could not be synthesized or measured. No partial timeline is returned.
    pub async fn assemble(
        &self,
        slides: &[SlideContent],
        images: &[PathBuf],
        intro: &str,
        outro: &str,
    ) -> Result<Timeline, PipelineError> {
        check_alignment(slides.len(), images.len())?;

        let plan: Vec<(UnitPosition, &str)> = std::iter::once((UnitPosition::Intro, intro))
            .chain(
                slides
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (UnitPosition::Slide(i), s.narration.as_str())),
            )
            .chain(std::iter::once((UnitPosition::Outro, outro)))
            .collect();

        let total = plan.len();
        if let Some(ref cb) = self.progress {
            cb.on_units_planned(total);
        }

        let mut units = Vec::with_capacity(total);
        for (idx, ((position, text), image)) in plan.into_iter().zip(images).enumerate() {
            let audio = self.workspace.join(format!("unit_{idx:03}.mp3"));
            let duration_secs = self
                .narrate(text, &audio)
                .await
                .map_err(|detail| PipelineError::Synthesis {
                    unit: position.to_string(),
                    detail,
                })?;

            debug!("{}: {:.3}s ({})", position, duration_secs, image.display());
            if let Some(ref cb) = self.progress {
                cb.on_unit_complete(idx, total, duration_secs);
            }

            units.push(TimelineUnit {
                position,
                image: image.clone(),
                audio,
                duration_secs,
            });
        }

        let timeline = Timeline { units };
        info!(
            "Timeline assembled: {} units, {:.2}s total",
            timeline.len(),
            timeline.total_duration_secs()
        );
        Ok(timeline)
    }

    /// A one-unit timeline showing `image` for the length of `text`.
    ///
    /// Used for stand-alone segments; failures name the unit `label`.
    pub async fn assemble_single(
        &self,
        label: &str,
        image: &Path,
        text: &str,
    ) -> Result<Timeline, PipelineError> {
        let audio = self.workspace.join("unit_000.mp3");
        let duration_secs =
            self.narrate(text, &audio)
                .await
                .map_err(|detail| PipelineError::Synthesis {
                    unit: label.to_string(),
                    detail,
                })?;
        debug!("{}: {:.3}s", label, duration_secs);
        Ok(Timeline {
            units: vec![TimelineUnit {
                position: UnitPosition::Slide(0),
                image: image.to_path_buf(),
                audio,
                duration_secs,
            }],
        })
    }

    /// Synthesize `text` into `audio` and return its measured duration.
    async fn narrate(&self, text: &str, audio: &Path) -> Result<f64, String> {
        if text.trim().is_empty() {
            return Err("narration is empty".to_string());
        }

        let label = format!("synthesis of {}", audio.display());
        self.policy
            .run(
                &label,
                || self.synthesizer.synthesize(text, audio),
                |_| true,
            )
            .await
            .map_err(|ex| format!("{} (after {} attempt(s))", ex.error, ex.attempts))?;

        let duration = self.probe.duration_secs(audio).await?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(format!("audio has no usable duration ({duration})"));
        }
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSynth {
        texts: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Synthesizer for RecordingSynth {
        async fn synthesize(&self, text: &str, _output: &Path) -> Result<(), String> {
            self.texts.lock().unwrap().push(text.to_string());
            if self.fail_on.as_deref() == Some(text) {
                return Err("voice unavailable".into());
            }
            Ok(())
        }
    }

    /// Duration keyed by the unit file name.
    struct TableProbe(HashMap<String, f64>);

    #[async_trait]
    impl AudioProbe for TableProbe {
        async fn duration_secs(&self, audio: &Path) -> Result<f64, String> {
            let name = audio.file_name().unwrap().to_string_lossy().to_string();
            self.0.get(&name).copied().ok_or_else(|| format!("no entry for {name}"))
        }
    }

    fn slides(n: usize) -> Vec<SlideContent> {
        (0..n)
            .map(|i| SlideContent {
                title: format!("S{i}"),
                content: String::new(),
                key_points: vec![],
                narration: format!("narration {i}"),
            })
            .collect()
    }

    fn images(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("slide_{i}.png"))).collect()
    }

    fn probe(durations: &[f64]) -> Arc<TableProbe> {
        Arc::new(TableProbe(
            durations
                .iter()
                .enumerate()
                .map(|(i, d)| (format!("unit_{i:03}.mp3"), *d))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn durations_come_from_probe() {
        let synth = Arc::new(RecordingSynth::default());
        let a = TimelineAssembler::new(synth.clone(), probe(&[1.5, 7.3, 2.0]), "/work");
        let t = a.assemble(&slides(1), &images(3), "hello", "bye").await.unwrap();
        let d: Vec<f64> = t.units.iter().map(|u| u.duration_secs).collect();
        assert_eq!(d, vec![1.5, 7.3, 2.0]);
        assert_eq!(
            t.units.iter().map(|u| u.position).collect::<Vec<_>>(),
            vec![UnitPosition::Intro, UnitPosition::Slide(0), UnitPosition::Outro]
        );
        assert_eq!(t.units[1].audio, PathBuf::from("/work/unit_001.mp3"));
        assert_eq!(
            *synth.texts.lock().unwrap(),
            vec!["hello", "narration 0", "bye"]
        );
    }

    #[tokio::test]
    async fn misaligned_images_fail_before_synthesis() {
        for n in 0..4 {
            for wrong in [n + 1, n + 3] {
                let synth = Arc::new(RecordingSynth::default());
                let a = TimelineAssembler::new(synth.clone(), probe(&[]), "/work");
                let err = a
                    .assemble(&slides(n), &images(wrong), "hi", "bye")
                    .await
                    .unwrap_err();
                match err {
                    PipelineError::Alignment { expected, actual } => {
                        assert_eq!(expected, n + 2);
                        assert_eq!(actual, wrong);
                    }
                    other => panic!("unexpected error: {other}"),
                }
                assert!(synth.texts.lock().unwrap().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn synthesis_failure_names_unit() {
        let synth = Arc::new(RecordingSynth {
            fail_on: Some("narration 1".into()),
            ..Default::default()
        });
        let a = TimelineAssembler::new(synth.clone(), probe(&[1.0, 1.0, 1.0, 1.0]), "/work")
            .with_retry(RetryPolicy::new(1, 1));
        let err = a.assemble(&slides(2), &images(4), "hi", "bye").await.unwrap_err();
        match err {
            PipelineError::Synthesis { unit, detail } => {
                assert_eq!(unit, "slide 2");
                assert!(detail.contains("2 attempt"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
        // intro, slide 0, slide 1 twice; outro never reached.
        assert_eq!(synth.texts.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn zero_duration_is_rejected() {
        let a = TimelineAssembler::new(
            Arc::new(RecordingSynth::default()),
            probe(&[2.0, 0.0, 1.0]),
            "/work",
        );
        let err = a.assemble(&slides(1), &images(3), "hi", "bye").await.unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis { ref unit, .. } if unit == "slide 1"));
    }

    #[test]
    fn alignment_check() {
        assert!(check_alignment(3, 5).is_ok());
        assert!(check_alignment(0, 2).is_ok());
        assert!(check_alignment(3, 4).is_err());
    }
}
