//! Trait seams for the pipeline's external collaborators.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::outcome::FileOutcome;

// =============================================================================
// EXTRACTION
// =============================================================================

/// A text-extraction capability addressed by local file path.
///
/// Implementations may take as long as the backing service takes; the
/// caller decides whether to bound the call.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text content of the file at `path`.
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Check if the extractor's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this extractor.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: TextExtractor + ?Sized> TextExtractor for Arc<T> {
    async fn extract(&self, path: &Path) -> Result<String> {
        (**self).extract(path).await
    }

    async fn health_check(&self) -> Result<bool> {
        (**self).health_check().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Destination for per-file extraction outcomes.
///
/// Called from extraction tasks; implementations must not block.
pub trait ResultSink: Send + Sync {
    fn record(&self, outcome: FileOutcome);
}

impl<T: ResultSink + ?Sized> ResultSink for Arc<T> {
    fn record(&self, outcome: FileOutcome) {
        (**self).record(outcome)
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// A message pulled from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Message key (the job id for messages written by the producer).
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

impl QueueMessage {
    pub fn new(key: Option<String>, payload: Vec<u8>) -> Self {
        Self {
            key,
            payload,
            partition: 0,
            offset: 0,
        }
    }
}

/// Consumer side of the queue: sequential pulls.
///
/// `pull` may suspend until a message is available. It is cancel-safe in the
/// sense that dropping the future loses no message that was not yet returned.
#[async_trait]
pub trait MessageSource: Send {
    async fn pull(&mut self) -> Result<QueueMessage>;

    /// Mark `message` as handled so a restarted source resumes after it.
    ///
    /// Sources without durable positions accept and ignore the call.
    async fn commit(&mut self, _message: &QueueMessage) -> Result<()> {
        Ok(())
    }
}

/// Producer side of the queue.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn publish(&self, key: &str, value: &[u8]) -> Result<()>;
}
