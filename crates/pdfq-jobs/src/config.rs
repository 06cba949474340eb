//! Extraction and consumer-loop configuration.

use std::time::Duration;

use backon::ExponentialBuilder;

use pdfq_core::defaults::{
    ENV_EXTRACTION_MAX_RETRIES, ENV_EXTRACTION_TIMEOUT_SECS, ENV_PDF_EXTRACTOR,
    ENV_PDF_MAX_CONCURRENT, ENV_PULL_BACKOFF_MAX_MS, ENV_PULL_BACKOFF_MIN_MS, ENV_TIKA_URL,
    EXTRACTION_MAX_RETRIES, EXTRACTION_RETRY_MAX_DELAY_MS, EXTRACTION_RETRY_MIN_DELAY_MS,
    PDF_MAX_CONCURRENT, PULL_BACKOFF_MAX_MS, PULL_BACKOFF_MIN_MS, TIKA_URL,
};
use pdfq_core::{Error, Result};

/// Which extraction backend the consumer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorBackend {
    /// Tika-compatible HTTP server.
    #[default]
    Tika,
    /// Local poppler `pdftotext`.
    PdfToText,
}

impl ExtractorBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tika" => Some(ExtractorBackend::Tika),
            "pdftotext" | "pdf_text" => Some(ExtractorBackend::PdfToText),
            _ => None,
        }
    }
}

/// What happens after a file's extraction fails.
///
/// With `max_retries == 0` a failure is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: EXTRACTION_MAX_RETRIES,
            min_delay: Duration::from_millis(EXTRACTION_RETRY_MIN_DELAY_MS),
            max_delay: Duration::from_millis(EXTRACTION_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Backoff schedule between attempts.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Delay bounds between failed queue pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullBackoff {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PullBackoff {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(PULL_BACKOFF_MIN_MS),
            max_delay: Duration::from_millis(PULL_BACKOFF_MAX_MS),
        }
    }
}

impl PullBackoff {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Create from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PULL_BACKOFF_MIN_MS` | `100` | First delay after a failed pull |
    /// | `PULL_BACKOFF_MAX_MS` | `30000` | Delay ceiling |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_ms = lookup(ENV_PULL_BACKOFF_MIN_MS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(PULL_BACKOFF_MIN_MS);
        let max_ms = lookup(ENV_PULL_BACKOFF_MAX_MS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(PULL_BACKOFF_MAX_MS);
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Unbounded exponential schedule capped at `max_delay`.
    pub fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .without_max_times()
            .with_jitter()
    }
}

/// Configuration for the extraction orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Permit pool capacity shared by every job.
    pub max_concurrent: usize,
    /// Optional bound on a single extraction call.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
    pub backend: ExtractorBackend,
    pub tika_url: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: PDF_MAX_CONCURRENT,
            timeout: None,
            retry: RetryPolicy::default(),
            backend: ExtractorBackend::default(),
            tika_url: TIKA_URL.to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PDF_MAX_CONCURRENT` | `3` | Concurrent extraction calls |
    /// | `PDF_EXTRACTOR` | `tika` | `tika` or `pdftotext` |
    /// | `TIKA_URL` | `http://localhost:9998` | Tika base URL |
    /// | `EXTRACTION_TIMEOUT_SECS` | unset | Per-call timeout, none when unset or 0 |
    /// | `EXTRACTION_MAX_RETRIES` | `0` | Retries after a failed call |
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown `PDF_EXTRACTOR` value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_concurrent = lookup(ENV_PDF_MAX_CONCURRENT)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(PDF_MAX_CONCURRENT)
            .max(1);

        let backend = match lookup(ENV_PDF_EXTRACTOR) {
            Some(raw) if !raw.trim().is_empty() => ExtractorBackend::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "{} must be 'tika' or 'pdftotext', got '{}'",
                    ENV_PDF_EXTRACTOR, raw
                ))
            })?,
            _ => ExtractorBackend::default(),
        };

        let tika_url = lookup(ENV_TIKA_URL)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| TIKA_URL.to_string());

        let timeout = lookup(ENV_EXTRACTION_TIMEOUT_SECS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let max_retries = lookup(ENV_EXTRACTION_MAX_RETRIES)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(EXTRACTION_MAX_RETRIES);

        Ok(Self {
            max_concurrent,
            timeout,
            retry: RetryPolicy::default().with_max_retries(max_retries),
            backend,
            tika_url,
        })
    }

    /// Set the permit pool capacity (minimum 1).
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_backend(mut self, backend: ExtractorBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_tika_url(mut self, url: impl Into<String>) -> Self {
        self.tika_url = url.into();
        self
    }
}
