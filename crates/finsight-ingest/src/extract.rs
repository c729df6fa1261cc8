//! Raw text extraction from uploaded document bytes.
//!
//! PDFs are extracted with `pdftotext`/`pdfinfo` (poppler-utils). For large
//! PDFs (> 100 pages), extraction is batched in 50-page chunks to bound
//! memory usage, and each invocation is guarded by a per-command timeout.
//! Bytes that are not a PDF are accepted as plain UTF-8 text.

use std::io::Write;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use finsight_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, LARGE_PDF_PAGE_THRESHOLD, PDF_BATCH_PAGES, PLAIN_TEXT_PAGE_CHARS,
};
use finsight_core::{Error, Result};

/// Raw text plus page count pulled from one source document.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

/// Extractor for uploaded document bytes.
pub struct TextExtractor;

impl TextExtractor {
    /// Extract text and page count from raw bytes.
    ///
    /// Dispatches on magic bytes: `%PDF` goes through poppler, anything else
    /// must be valid UTF-8 and is taken verbatim with an estimated page
    /// count.
    pub async fn extract(&self, data: &[u8], filename: &str) -> Result<ExtractedText> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot extract text from empty input".to_string(),
            ));
        }

        if data.len() >= 4 && &data[0..4] == b"%PDF" {
            return self.extract_pdf(data, filename).await;
        }

        match std::str::from_utf8(data) {
            Ok(text) => {
                let page_count = estimate_pages(text);
                debug!(filename, page_count, "Treating input as plain text");
                Ok(ExtractedText {
                    text: text.to_string(),
                    page_count,
                })
            }
            Err(_) => Err(Error::InvalidInput(format!(
                "File '{}' is neither a PDF nor valid UTF-8 text",
                filename
            ))),
        }
    }

    async fn extract_pdf(&self, data: &[u8], filename: &str) -> Result<ExtractedText> {
        // pdftotext reads from a file path
        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Extraction(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(data)
            .map_err(|e| Error::Extraction(format!("Failed to write temp file: {}", e)))?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let pages = match run_cmd_with_timeout(
            Command::new("pdfinfo").arg(&tmp_path),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await
        {
            Ok(output) => parse_page_count(&output).unwrap_or(0),
            Err(e) => {
                warn!(filename, error = %e, "pdfinfo failed, continuing without page count");
                0
            }
        };

        let text = if pages > LARGE_PDF_PAGE_THRESHOLD {
            debug!(filename, pages, "Large PDF detected, extracting in batches");
            let mut parts = Vec::new();
            let mut start = 1usize;
            while start <= pages {
                let end = (start + PDF_BATCH_PAGES - 1).min(pages);
                let part = run_cmd_with_timeout(
                    Command::new("pdftotext")
                        .arg("-f")
                        .arg(start.to_string())
                        .arg("-l")
                        .arg(end.to_string())
                        .arg(&tmp_path)
                        .arg("-"),
                    EXTRACTION_CMD_TIMEOUT_SECS,
                )
                .await?;
                parts.push(part);
                start = end + 1;
            }
            parts.join("")
        } else {
            run_cmd_with_timeout(
                Command::new("pdftotext").arg(&tmp_path).arg("-"),
                EXTRACTION_CMD_TIMEOUT_SECS,
            )
            .await?
        };

        if text.trim().is_empty() {
            return Err(Error::Extraction(format!(
                "PDF '{}' yielded no text (scanned document?)",
                filename
            )));
        }

        let page_count = if pages > 0 { pages } else { estimate_pages(&text) };
        Ok(ExtractedText { text, page_count })
    }

    /// Check whether the external extraction tool is installed.
    pub async fn pdftotext_available() -> bool {
        match Command::new("pdftotext").arg("-v").output().await {
            // pdftotext -v prints version to stderr and exits with 0 or 99
            // depending on the version. Both indicate the binary exists.
            Ok(output) => output.status.success() || output.status.code() == Some(99),
            Err(_) => false,
        }
    }
}

/// Estimate page count for sources without page structure.
fn estimate_pages(text: &str) -> usize {
    (text.len() / PLAIN_TEXT_PAGE_CHARS).max(1)
}

/// Pull the `Pages:` line out of `pdfinfo` output.
fn parse_page_count(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("pages") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("External command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
