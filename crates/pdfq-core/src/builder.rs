//! Producer-side job construction from local files.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{JOB_ID_PREFIX, JOB_ID_RANDOM_BYTES, PDF_EXTENSION};
use crate::error::{Error, Result};
use crate::job::{FileDescriptor, Job};

/// Build a single-file job from a local PDF path.
pub fn build_job(path: impl AsRef<Path>) -> Result<Job> {
    JobBuilder::new().add_file(path)?.build()
}

/// Generate a job id of the form `job_<epoch_secs>_<8 hex chars>`.
///
/// The timestamp orders ids roughly by creation time; the random suffix
/// keeps ids created in the same second apart.
pub fn generate_job_id(timestamp: i64) -> String {
    let suffix: [u8; JOB_ID_RANDOM_BYTES] = rand::random();
    format!("{}_{}_{}", JOB_ID_PREFIX, timestamp, hex::encode(suffix))
}

/// Collects validated files into a [`Job`].
#[derive(Debug, Default)]
pub struct JobBuilder {
    files: Vec<FileDescriptor>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a local file and add it to the job.
    ///
    /// Fails with [`Error::NotFound`] if the path does not exist and with
    /// [`Error::InvalidType`] if it does not carry a `.pdf` extension.
    pub fn add_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::NotFound(format!(
                "file does not exist: {}",
                path.display()
            )));
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some(PDF_EXTENSION) {
            return Err(Error::InvalidType(format!(
                "file is not a PDF: {}",
                path.display()
            )));
        }

        let absolute = absolute_path(path)?;
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidType(format!("path has no file name: {}", absolute.display()))
            })?;

        debug!(file_path = %absolute.display(), file_name = %name, "Added file to job");
        self.files
            .push(FileDescriptor::new(absolute.to_string_lossy(), name));
        Ok(self)
    }

    /// Number of files added so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Finish the job, stamping it with the current time and a fresh id.
    pub fn build(self) -> Result<Job> {
        if self.files.is_empty() {
            return Err(Error::Validation("job has no files".to_string()));
        }
        let now = chrono::Utc::now().timestamp();
        Ok(Job::new(generate_job_id(now), now, self.files))
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
