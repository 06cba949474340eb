//! Kafka consumer and producer adapters built on `rskafka`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::stream::{self, BoxStream, StreamExt};
use rskafka::client::consumer::{StartOffset, StreamConsumerBuilder};
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use rskafka::record::{Record, RecordAndOffset};
use tracing::{debug, info, warn};

use pdfq_core::defaults::KAFKA_FETCH_MAX_WAIT_MS;
use pdfq_core::{Error, MessageSink, MessageSource, QueueMessage, Result};

use crate::config::{BrokerConfig, StartFrom};
use crate::offsets::FileOffsetStore;

type PartitionItem = (
    i32,
    std::result::Result<(RecordAndOffset, i64), rskafka::client::error::Error>,
);

async fn connect(config: &BrokerConfig) -> Result<Client> {
    ClientBuilder::new(config.brokers.clone())
        .build()
        .await
        .map_err(|e| {
            Error::Queue(format!(
                "failed to connect to Kafka brokers {:?}: {}",
                config.brokers, e
            ))
        })
}

async fn partition_client(client: &Client, topic: &str, partition: i32) -> Result<PartitionClient> {
    client
        .partition_client(topic.to_string(), partition, UnknownTopicHandling::Retry)
        .await
        .map_err(|e| {
            Error::Queue(format!(
                "failed to get client for {}/{}: {}",
                topic, partition, e
            ))
        })
}

/// Where to start reading a partition.
///
/// A committed partition resumes right after the last handled record;
/// otherwise `start_from` applies.
pub fn resume_offset(committed: Option<i64>, start_from: StartFrom) -> StartOffset {
    match (committed, start_from) {
        (Some(offset), _) => StartOffset::At(offset + 1),
        (None, StartFrom::Earliest) => StartOffset::Earliest,
        (None, StartFrom::Latest) => StartOffset::Latest,
    }
}

/// Choose a partition for a message key.
///
/// All messages with the same key land on the same partition.
pub fn partition_for_key(key: &str, partitions: u32) -> i32 {
    let hash: u32 = key
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    (hash % partitions.max(1)) as i32
}

// =============================================================================
// CONSUMER
// =============================================================================

/// Sequential reader over every partition of the job topic.
///
/// One `rskafka` stream consumer runs per partition; their records are
/// merged into a single stream so callers see one message at a time.
/// Handled offsets are committed to the group's [`FileOffsetStore`]; a
/// restarted source resumes after them, and partitions the group has never
/// committed begin at the configured [`StartFrom`] position.
pub struct KafkaSource {
    stream: BoxStream<'static, PartitionItem>,
    topic: String,
    offsets: FileOffsetStore,
    _client: Arc<Client>,
}

impl KafkaSource {
    /// Connect to the brokers and start one consumer per partition.
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let offsets =
            FileOffsetStore::open(&config.offset_dir, &config.group_id, &config.topic).await?;
        let client = Arc::new(connect(config).await?);

        let mut consumers = Vec::with_capacity(config.partitions as usize);
        for partition in 0..config.partitions as i32 {
            let pc = Arc::new(partition_client(&client, &config.topic, partition).await?);
            let committed = offsets.committed(partition);
            debug!(
                subsystem = "queue",
                component = "consumer",
                partition,
                committed,
                "Resuming partition"
            );
            let start = resume_offset(committed, config.start_from);
            let consumer = StreamConsumerBuilder::new(pc, start)
                .with_max_wait_ms(KAFKA_FETCH_MAX_WAIT_MS)
                .build()
                .map(move |item| (partition, item));
            consumers.push(consumer.boxed());
        }

        info!(
            subsystem = "queue",
            component = "consumer",
            topic = %config.topic,
            group_id = %config.group_id,
            partitions = config.partitions,
            start_from = ?config.start_from,
            "Kafka consumer connected"
        );

        Ok(Self {
            stream: stream::select_all(consumers).boxed(),
            topic: config.topic.clone(),
            offsets,
            _client: client,
        })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn pull(&mut self) -> Result<QueueMessage> {
        match self.stream.next().await {
            Some((partition, Ok((record_and_offset, _high_watermark)))) => {
                let RecordAndOffset { record, offset } = record_and_offset;
                let key = record
                    .key
                    .map(|k| String::from_utf8_lossy(&k).into_owned());
                debug!(
                    topic = %self.topic,
                    partition,
                    offset,
                    key = key.as_deref().unwrap_or(""),
                    "Received message"
                );
                Ok(QueueMessage {
                    key,
                    payload: record.value.unwrap_or_default(),
                    partition,
                    offset,
                })
            }
            Some((partition, Err(e))) => Err(Error::TransientRead(format!(
                "fetch from {}/{} failed: {}",
                self.topic, partition, e
            ))),
            None => Err(Error::TransientRead(format!(
                "all consumers for {} have stopped",
                self.topic
            ))),
        }
    }

    async fn commit(&mut self, message: &QueueMessage) -> Result<()> {
        self.offsets.commit(message.partition, message.offset).await
    }
}

// =============================================================================
// PRODUCER
// =============================================================================

/// Publishes encoded jobs to the job topic, keyed by job id.
pub struct KafkaPublisher {
    client: Arc<Client>,
    topic: String,
    partitions: u32,
}

impl KafkaPublisher {
    /// Connect to the brokers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Queue`] if the bootstrap connection fails.
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let client = connect(config).await?;
        Ok(Self {
            client: Arc::new(client),
            topic: config.topic.clone(),
            partitions: config.partitions,
        })
    }

    /// Retry policy for produce calls.
    fn retry_policy() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(3)
            .with_jitter()
    }
}

#[async_trait]
impl MessageSink for KafkaPublisher {
    async fn publish(&self, key: &str, value: &[u8]) -> Result<()> {
        let partition = partition_for_key(key, self.partitions);
        let pc = partition_client(&self.client, &self.topic, partition)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;

        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(value.to_vec()),
            headers: Default::default(),
            timestamp: chrono::Utc::now(),
        };

        (|| async {
            pc.produce(vec![record.clone()], Compression::NoCompression)
                .await
                .map_err(|e| Error::Publish(e.to_string()))
        })
        .retry(Self::retry_policy())
        .when(Error::is_retryable)
        .notify(|err, dur| {
            warn!(
                error = %err,
                "Kafka send failed. Retrying in {:.1}s",
                dur.as_secs_f32()
            );
        })
        .await?;

        info!(
            subsystem = "queue",
            component = "publisher",
            topic = %self.topic,
            partition,
            key,
            "Message sent"
        );
        Ok(())
    }
}
