//! Slide rendering: Marp deck → PDF → one PNG per slide.
//!
//! ## Why go through a PDF?
//!
//! Marp's own image output writes one file per slide with names we do not
//! control. Exporting a PDF and rasterising it with pdfium gives us the page
//! order directly and a fixed naming scheme (`slide_{i}.png`), so image `i`
//! is always deck slide `i`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so
//! Tokio worker threads never stall during rasterisation.

use crate::pipeline::deck::SlideDeck;
use crate::pipeline::run_tool;
use crate::services::SlideRenderer;
use async_trait::async_trait;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// [`SlideRenderer`] that drives the `marp` CLI and rasterises with pdfium.
#[derive(Debug, Clone)]
pub struct MarpRenderer {
    marp: PathBuf,
    dpi: u32,
}

impl MarpRenderer {
    pub fn new(marp: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            marp: marp.into(),
            dpi,
        }
    }
}

#[async_trait]
impl SlideRenderer for MarpRenderer {
    async fn render(&self, deck: &SlideDeck, workspace: &Path) -> Result<Vec<PathBuf>, String> {
        tokio::fs::create_dir_all(workspace)
            .await
            .map_err(|e| format!("cannot create {}: {e}", workspace.display()))?;

        let deck_path = workspace.join("deck.md");
        let pdf_path = workspace.join("deck.pdf");
        tokio::fs::write(&deck_path, &deck.markdown)
            .await
            .map_err(|e| format!("cannot write {}: {e}", deck_path.display()))?;

        let mut cmd = Command::new(&self.marp);
        cmd.arg(&deck_path)
            .arg("--pdf")
            .arg("--allow-local-files")
            .arg("-o")
            .arg(&pdf_path);
        run_tool(&mut cmd, "marp").await?;

        let target = RasterTarget {
            expected_pages: deck.slide_count(),
            width: target_px(deck.width, self.dpi),
            height: target_px(deck.height, self.dpi),
        };
        let out_dir = workspace.to_path_buf();
        let images = tokio::task::spawn_blocking(move || rasterise_blocking(&pdf_path, &out_dir, target))
            .await
            .map_err(|e| format!("render task panicked: {e}"))??;

        info!("Rendered {} slide images", images.len());
        Ok(images)
    }
}

/// Page count and pixel size the rasterised deck must have.
#[derive(Debug, Clone, Copy)]
struct RasterTarget {
    expected_pages: usize,
    width: i32,
    height: i32,
}

/// Pixels for `css_px` at `dpi`. Marp lays slides out at 96 CSS px per inch.
fn target_px(css_px: u32, dpi: u32) -> i32 {
    (u64::from(css_px) * u64::from(dpi) / 96).clamp(1, i32::MAX as u64) as i32
}

fn check_page_count(expected: usize, actual: usize) -> Result<(), String> {
    if expected == actual {
        Ok(())
    } else {
        Err(format!(
            "marp produced {actual} pages for a deck of {expected} slides"
        ))
    }
}

/// Rasterise every page of `pdf_path` into `out_dir/slide_{i}.png`.
fn rasterise_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    target: RasterTarget,
) -> Result<Vec<PathBuf>, String> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| format!("cannot open rendered deck: {e:?}"))?;

    let pages = document.pages();
    check_page_count(target.expected_pages, pages.len() as usize)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(target.width)
        .set_maximum_height(target.height);

    let mut paths = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("slide {idx}: {e:?}"))?;
        let image = bitmap.as_image();
        let path = out_dir.join(format!("slide_{idx}.png"));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| format!("slide {idx}: cannot save {}: {e}", path.display()))?;
        debug!(
            "Rendered slide {} → {}x{} px",
            idx,
            image.width(),
            image.height()
        );
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_px_follows_dpi() {
        assert_eq!(target_px(1920, 96), 1920);
        assert_eq!(target_px(1920, 144), 2880);
        assert_eq!(target_px(1080, 72), 810);
    }

    #[test]
    fn page_count_must_match_deck() {
        assert!(check_page_count(5, 5).is_ok());
        let err = check_page_count(5, 6).unwrap_err();
        assert!(err.contains("6 pages"), "{err}");
        assert!(err.contains("5 slides"), "{err}");
    }
}
