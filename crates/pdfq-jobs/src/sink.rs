//! Destinations for per-file extraction outcomes.

use std::sync::Mutex;

use tracing::{debug, info, warn};

use pdfq_core::defaults::TEXT_PREVIEW_CHARS;
use pdfq_core::{FileOutcome, ResultSink};

/// Logs each outcome and discards it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn record(&self, outcome: FileOutcome) {
        match &outcome.result {
            Ok(text) => {
                info!(
                    subsystem = "jobs",
                    component = "sink",
                    job_id = %outcome.job_id,
                    file_name = %outcome.file.name,
                    char_count = text.char_count,
                    attempts = outcome.attempts,
                    duration_ms = outcome.duration_ms,
                    "Extraction complete"
                );
                debug!(
                    job_id = %outcome.job_id,
                    file_name = %outcome.file.name,
                    preview = text.preview(TEXT_PREVIEW_CHARS),
                    "Text preview"
                );
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "sink",
                    job_id = %outcome.job_id,
                    file_name = %outcome.file.name,
                    file_path = %outcome.file.path,
                    attempts = outcome.attempts,
                    duration_ms = outcome.duration_ms,
                    error = %e,
                    "Extraction failed"
                );
            }
        }
    }
}

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<FileOutcome>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all outcomes recorded so far, in completion order.
    pub fn outcomes(&self) -> Vec<FileOutcome> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn for_job(&self, job_id: &str) -> Vec<FileOutcome> {
        self.lock()
            .iter()
            .filter(|o| o.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Outcome for a file, looked up by job id and display name.
    pub fn get(&self, job_id: &str, file_name: &str) -> Option<FileOutcome> {
        self.lock()
            .iter()
            .find(|o| o.job_id == job_id && o.file.name == file_name)
            .cloned()
    }

    pub fn succeeded(&self) -> usize {
        self.lock().iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.lock().iter().filter(|o| !o.is_success()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FileOutcome>> {
        // A panicking recorder cannot leave the Vec half-written.
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultSink for MemorySink {
    fn record(&self, outcome: FileOutcome) {
        self.lock().push(outcome);
    }
}
