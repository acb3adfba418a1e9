//! Text extraction with pdfium.
//!
//! pdfium is not async-safe, so the work runs on the blocking pool via
//! `tokio::task::spawn_blocking`. Page texts are concatenated in page order
//! with no separator, so the chunker sees the document exactly as pdfium
//! reports it.

use crate::services::TextExtractor;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// [`TextExtractor`] backed by the pdfium library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumExtractor;

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, document: &Path) -> Result<String, String> {
        let path = document.to_path_buf();
        tokio::task::spawn_blocking(move || extract_blocking(&path))
            .await
            .map_err(|e| format!("extraction task panicked: {e}"))?
    }
}

fn extract_blocking(path: &Path) -> Result<String, String> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| format!("{e:?}"))?;

    let pages = document.pages();
    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| format!("page {}: {e:?}", idx + 1))?
            .all();
        debug!("Page {}: {} chars", idx + 1, page_text.chars().count());
        text.push_str(&page_text);
    }

    info!(
        "Extracted {} chars from {} pages",
        text.chars().count(),
        pages.len()
    );
    Ok(text)
}
