//! Text extraction — PDF text-layer parsing and image OCR.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;

/// What the declared MIME type says the upload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

/// Classifies a declared MIME type. `None` means unsupported.
pub fn classify_mime(mime: &str) -> Option<FileKind> {
    if mime == "application/pdf" {
        Some(FileKind::Pdf)
    } else if mime.starts_with("image/") {
        Some(FileKind::Image)
    } else {
        None
    }
}

/// Extracts plain text from the transient file at `path`.
pub async fn extract_text(kind: FileKind, path: &Path) -> Result<String> {
    match kind {
        FileKind::Pdf => extract_pdf(path.to_path_buf()).await,
        FileKind::Image => ocr_image(path).await,
    }
}

/// PDF text-layer extraction. `pdf_extract` is CPU-bound, so it runs on a
/// blocking worker thread.
async fn extract_pdf(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&path).map_err(|e| anyhow!("Failed to parse PDF: {e}"))
    })
    .await
    .context("PDF extraction task panicked")?
}

/// Image OCR via the `tesseract` binary (tesseract-ocr package).
async fn ocr_image(path: &Path) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .args(["-l", "eng"])
        .output()
        .await
        .context("Failed to run tesseract — is tesseract-ocr installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract exited with an error: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
