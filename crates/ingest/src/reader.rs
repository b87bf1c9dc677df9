use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::panic;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static EXTRA_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

pub struct PdfReader;

impl PdfReader {
    /// Extract and normalize the text of a PDF file.
    ///
    /// Tries `pdf-extract` first and falls back to `lopdf` page extraction
    /// when that fails or comes back empty.
    pub async fn read_pdf(path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", path))?;

        let raw = tokio::task::spawn_blocking(move || extract_from_bytes(&bytes))
            .await
            .context("PDF extraction task failed")??;

        Ok(normalize_text(&raw))
    }

    /// PDF files directly inside `dir`, sorted by file name.
    pub async fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    if ext.eq_ignore_ascii_case("pdf") {
                        files.push(path);
                    }
                }
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

fn extract_from_bytes(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed fonts
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
        Ok(Ok(_)) => debug!("pdf-extract returned no text, trying lopdf"),
        Ok(Err(e)) => debug!(error = %e, "pdf-extract failed, trying lopdf"),
        Err(_) => debug!("pdf-extract panicked, trying lopdf"),
    }

    let doc = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .context("Failed to extract text from PDF pages")
}

/// Turn page breaks into newlines and collapse runs of blank lines and spaces.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\x0c', "\n");
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");
    let text = EXTRA_SPACES.replace_all(&text, " ");
    text.trim().to_string()
}
