//! Per-file extraction outcomes.

use serde::{Deserialize, Serialize};

use crate::job::FileDescriptor;

/// Text extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    /// Length of `text` in characters.
    pub char_count: usize,
}

impl ExtractedText {
    pub fn new(text: String) -> Self {
        let char_count = text.chars().count();
        Self { text, char_count }
    }

    /// First `max_chars` characters of the text, cut on a character boundary.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// The finalized result of one extraction task.
///
/// Every file descriptor of a job gets its own outcome; there is no
/// job-wide pass/fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub job_id: String,
    pub file: FileDescriptor,
    pub result: std::result::Result<ExtractedText, String>,
    /// Number of extraction calls made, retries included.
    pub attempts: u32,
    pub duration_ms: u64,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The error message, if this file failed.
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}
