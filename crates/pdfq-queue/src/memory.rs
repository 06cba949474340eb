//! In-process queue with the same traits as the Kafka adapters.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use pdfq_core::{Error, MessageSink, MessageSource, QueueMessage, Result};

/// Create a bounded in-memory queue.
///
/// The publisher can be cloned; the source yields messages in publish order
/// and reports a read error once every publisher has been dropped and the
/// buffer is empty.
pub fn memory_queue(capacity: usize) -> (MemoryPublisher, MemorySource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MemoryPublisher {
            tx,
            next_offset: Arc::new(AtomicI64::new(0)),
        },
        MemorySource { rx },
    )
}

/// Sending half of [`memory_queue`].
#[derive(Clone)]
pub struct MemoryPublisher {
    tx: mpsc::Sender<QueueMessage>,
    next_offset: Arc<AtomicI64>,
}

#[async_trait]
impl MessageSink for MemoryPublisher {
    async fn publish(&self, key: &str, value: &[u8]) -> Result<()> {
        let message = QueueMessage {
            key: Some(key.to_string()),
            payload: value.to_vec(),
            partition: 0,
            offset: self.next_offset.fetch_add(1, Ordering::Relaxed),
        };
        self.tx
            .send(message)
            .await
            .map_err(|_| Error::Publish("in-memory queue closed".to_string()))
    }
}

/// Receiving half of [`memory_queue`].
pub struct MemorySource {
    rx: mpsc::Receiver<QueueMessage>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn pull(&mut self) -> Result<QueueMessage> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| Error::TransientRead("in-memory queue has no publishers".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_pull_in_order() {
        let (publisher, mut source) = memory_queue(8);
        publisher.publish("job_1", b"first").await.unwrap();
        publisher.publish("job_2", b"second").await.unwrap();

        let first = source.pull().await.unwrap();
        assert_eq!(first.key.as_deref(), Some("job_1"));
        assert_eq!(first.payload, b"first");
        assert_eq!(first.offset, 0);

        let second = source.pull().await.unwrap();
        assert_eq!(second.key.as_deref(), Some("job_2"));
        assert_eq!(second.offset, 1);
    }

    #[tokio::test]
    async fn test_pull_after_publishers_dropped() {
        let (publisher, mut source) = memory_queue(1);
        drop(publisher);
        let err = source.pull().await.unwrap_err();
        assert!(matches!(err, Error::TransientRead(_)));
    }

    #[tokio::test]
    async fn test_publish_after_source_dropped() {
        let (publisher, source) = memory_queue(1);
        drop(source);
        let err = publisher.publish("job_1", b"x").await.unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
    }
}
