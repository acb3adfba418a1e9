//! Pipeline stages for document-to-video conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. another TTS engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ─▶ extract ─▶ chunk ─▶ generate ─▶ flatten ─▶ deck ─▶ render
//!                                 │                              │
//!                             normalize                          ▼
//!                                          encode ◀─ timeline ◀─ speech
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`]: pull plain text out of the PDF with pdfium
//! 3. [`chunk`]: split the text into bounded, lossless chunks
//! 4. [`generate`]: one generation call per chunk, with timeout and retry;
//!    [`normalize`] turns the raw answer into a validated bundle
//! 5. [`flatten`]: concatenate per-chunk slides in order, resolve the palette
//! 6. [`deck`] / [`render`]: build the Marp deck and rasterise it to PNGs
//! 7. [`speech`] / [`timeline`]: narrate each unit and bind image to audio length
//! 8. [`encode`]: mux the timeline into one video, atomically
//! 9. [`shorts`]: optional portrait videos for short-form segments

pub mod chunk;
pub mod deck;
pub mod encode;
pub mod extract;
pub mod flatten;
pub mod generate;
pub mod input;
pub mod normalize;
pub mod render;
pub mod retry;
pub mod shorts;
pub mod speech;
pub mod timeline;

use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Run an external tool to completion.
///
/// A spawn failure or non-zero exit becomes an error string carrying the
/// tool's stderr.
pub(crate) async fn run_tool(cmd: &mut Command, name: &str) -> Result<Output, String> {
    debug!("Running {:?}", cmd.as_std());
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("could not run {name}: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "{name} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(output)
}
