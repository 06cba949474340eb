//! PdfToText extraction adapter: extracts text from PDFs using `pdftotext` (poppler-utils).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use pdfq_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, LARGE_PDF_PAGE_THRESHOLD, PDF_BATCH_PAGES};
use pdfq_core::{Error, Result, TextExtractor};

/// Adapter for extracting text from PDF files with `pdftotext`.
///
/// For large PDFs (> 100 pages), extraction is batched in 50-page chunks to
/// bound memory usage. Each `pdftotext` invocation is guarded by a per-command
/// timeout.
#[derive(Debug, Clone)]
pub struct PdfToTextExtractor {
    cmd_timeout: Duration,
}

impl Default for PdfToTextExtractor {
    fn default() -> Self {
        Self {
            cmd_timeout: Duration::from_secs(EXTRACTION_CMD_TIMEOUT_SECS),
        }
    }
}

impl PdfToTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cmd_timeout(mut self, timeout: Duration) -> Self {
        self.cmd_timeout = timeout;
        self
    }
}

/// Page count from `pdfinfo` output, 0 when absent.
fn parse_page_count(pdfinfo_output: &str) -> usize {
    pdfinfo_output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("pages"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0)
}

/// Inclusive 1-based page ranges covering `pages` in `batch`-sized chunks.
fn page_batches(pages: usize, batch: usize) -> Vec<(usize, usize)> {
    let batch = batch.max(1);
    let mut ranges = Vec::new();
    let mut start = 1usize;
    while start <= pages {
        let end = (start + batch - 1).min(pages);
        ranges.push((start, end));
        start = end + 1;
    }
    ranges
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<String> {
    let output = tokio::time::timeout(timeout, cmd.kill_on_drop(true).output())
        .await
        .map_err(|_| {
            Error::Extraction(format!(
                "External command timed out after {}s",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check the `%PDF` magic bytes without reading the whole file.
///
/// Every failure here is [`Error::InvalidDocument`].
async fn check_pdf_header(path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| {
            Error::InvalidDocument(format!("failed to open {}: {}", path.display(), e))
        })?;
    let mut magic = [0u8; 4];
    let mut read = 0;
    while read < magic.len() {
        let n = file.read(&mut magic[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }

    if read == 0 {
        return Err(Error::InvalidDocument(format!(
            "Cannot extract text from empty file {}",
            path.display()
        )));
    }
    if read < magic.len() || &magic != b"%PDF" {
        return Err(Error::InvalidDocument(format!(
            "File '{}' is not a valid PDF (missing %PDF header)",
            path.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl TextExtractor for PdfToTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        check_pdf_header(path).await?;

        let pages = match run_cmd_with_timeout(Command::new("pdfinfo").arg(path), self.cmd_timeout)
            .await
        {
            Ok(output) => parse_page_count(&output),
            Err(e) => {
                warn!(
                    component = "pdftotext",
                    file_path = %path.display(),
                    error = %e,
                    "pdfinfo failed, extracting without page count"
                );
                0
            }
        };

        if pages > LARGE_PDF_PAGE_THRESHOLD {
            debug!(
                component = "pdftotext",
                file_path = %path.display(),
                pages,
                "Large PDF detected, extracting in batches"
            );
            let mut text = String::new();
            for (first, last) in page_batches(pages, PDF_BATCH_PAGES) {
                let chunk = run_cmd_with_timeout(
                    Command::new("pdftotext")
                        .arg("-f")
                        .arg(first.to_string())
                        .arg("-l")
                        .arg(last.to_string())
                        .arg(path)
                        .arg("-"),
                    self.cmd_timeout,
                )
                .await?;
                text.push_str(&chunk);
            }
            Ok(text)
        } else {
            run_cmd_with_timeout(
                Command::new("pdftotext").arg(path).arg("-"),
                self.cmd_timeout,
            )
            .await
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match Command::new("pdftotext").arg("-v").output().await {
            // Exit code is 0 or 99 depending on the poppler version.
            Ok(output) => Ok(output.status.success() || output.status.code() == Some(99)),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pdftotext"
    }
}
