//! Input resolution: normalise a user-supplied path or URL to a local PDF.
//!
//! ## Why download to a temp file?
//!
//! pdfium requires a file-system path; it cannot stream from a byte buffer.
//! Downloading to a `TempDir` gives us a path pdfium can open while ensuring
//! cleanup happens automatically when `ResolvedInput` is dropped. We check
//! the PDF magic bytes (`%PDF`) before returning so callers get a meaningful
//! error rather than a pdfium failure.

use crate::error::PipelineError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input: either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory that is kept alive
    /// until this value is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF, downloading it first if it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PipelineError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn extraction_error(path: impl Into<PathBuf>, detail: impl Into<String>) -> PipelineError {
    PipelineError::Extraction {
        path: path.into(),
        detail: detail.into(),
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, PipelineError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(extraction_error(path, "file not found"));
    }

    let mut file = std::fs::File::open(&path).map_err(|e| extraction_error(&path, e.to_string()))?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(extraction_error(
            path,
            format!("not a PDF (starts with {:?})", String::from_utf8_lossy(&magic)),
        ));
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PipelineError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| extraction_error(url, e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            extraction_error(url, format!("download timed out after {timeout_secs}s"))
        } else {
            extraction_error(url, format!("download failed: {e}"))
        }
    })?;

    if !response.status().is_success() {
        return Err(extraction_error(
            url,
            format!("download failed: HTTP {}", response.status()),
        ));
    }

    let filename = filename_from_url(url);

    let temp_dir = TempDir::new().map_err(|e| PipelineError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| extraction_error(url, format!("download failed: {e}")))?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(extraction_error(url, "downloaded file is not a PDF"));
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PipelineError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(filename_from_url("https://x.org/papers/tides.pdf"), "tides.pdf");
        assert_eq!(filename_from_url("https://x.org/download"), "downloaded.pdf");
    }

    #[test]
    fn missing_file_is_extraction_error() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert_eq!(err.stage(), "extraction");
    }

    #[test]
    fn non_pdf_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not a PDF"), "{err}");
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        let resolved = resolve_local(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }
}
