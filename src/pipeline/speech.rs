//! Narration synthesis (edge-tts) and audio duration probing (ffprobe).

use crate::pipeline::run_tool;
use crate::services::{AudioProbe, Synthesizer};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// [`Synthesizer`] that shells out to the `edge-tts` CLI.
///
/// The narration is written to a sibling `.txt` file and passed with `-f`,
/// so long scripts never hit the argument-length limit.
#[derive(Debug, Clone)]
pub struct EdgeTts {
    program: PathBuf,
    voice: String,
    rate: String,
}

impl EdgeTts {
    pub fn new(program: impl Into<PathBuf>, voice: &str, rate: &str) -> Self {
        Self {
            program: program.into(),
            voice: voice.to_string(),
            rate: rate.to_string(),
        }
    }
}

#[async_trait]
impl Synthesizer for EdgeTts {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), String> {
        let text_path = output.with_extension("txt");
        tokio::fs::write(&text_path, text)
            .await
            .map_err(|e| format!("cannot write {}: {e}", text_path.display()))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("--voice")
            .arg(&self.voice)
            // `=` keeps a leading sign from being read as a flag.
            .arg(format!("--rate={}", self.rate))
            .arg("-f")
            .arg(&text_path)
            .arg("--write-media")
            .arg(output);
        run_tool(&mut cmd, "edge-tts").await?;

        if !output.exists() {
            return Err(format!("edge-tts produced no file at {}", output.display()));
        }
        debug!("Synthesized {} chars → {}", text.len(), output.display());
        Ok(())
    }
}

/// [`AudioProbe`] that asks `ffprobe` for the container duration.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: PathBuf,
}

impl Ffprobe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AudioProbe for Ffprobe {
    async fn duration_secs(&self, audio: &Path) -> Result<f64, String> {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(audio);
        let output = run_tool(&mut cmd, "ffprobe").await?;
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse ffprobe's bare duration output.
pub fn parse_duration(stdout: &str) -> Result<f64, String> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .map_err(|_| format!("ffprobe returned an unreadable duration: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_output() {
        assert_eq!(parse_duration("7.300000\n"), Ok(7.3));
        assert!(parse_duration("N/A\n").is_err());
        assert!(parse_duration("").is_err());
    }
}
