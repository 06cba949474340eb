//! Broker configuration shared by the producer and the consumer.

use std::path::PathBuf;

use pdfq_core::defaults::{
    ENV_KAFKA_BROKERS, ENV_KAFKA_GROUP_ID, ENV_KAFKA_OFFSET_DIR, ENV_KAFKA_PARTITIONS,
    ENV_KAFKA_START_OFFSET, ENV_KAFKA_TOPIC, KAFKA_BROKERS, KAFKA_GROUP_ID, KAFKA_OFFSET_DIR,
    KAFKA_PARTITIONS, KAFKA_TOPIC,
};

/// Where a consumer starts reading a partition its group has never committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFrom {
    Earliest,
    #[default]
    Latest,
}

impl StartFrom {
    /// Parse `earliest` / `latest` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "earliest" => Some(StartFrom::Earliest),
            "latest" => Some(StartFrom::Latest),
            _ => None,
        }
    }
}

/// Connection settings for the job topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Bootstrap broker addresses (`host:port`).
    pub brokers: Vec<String>,
    /// Topic carrying encoded jobs.
    pub topic: String,
    /// Number of topic partitions to consume from and hash keys into.
    pub partitions: u32,
    /// Start position for partitions without a committed offset.
    pub start_from: StartFrom,
    /// Consumer group owning the committed offsets.
    pub group_id: String,
    /// Directory where committed offsets are stored, one subdirectory per group.
    pub offset_dir: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: vec![KAFKA_BROKERS.to_string()],
            topic: KAFKA_TOPIC.to_string(),
            partitions: KAFKA_PARTITIONS,
            start_from: StartFrom::default(),
            group_id: KAFKA_GROUP_ID.to_string(),
            offset_dir: PathBuf::from(KAFKA_OFFSET_DIR),
        }
    }
}

impl BrokerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `KAFKA_BROKERS` | `localhost:9092` | Comma-separated `host:port` list |
    /// | `KAFKA_TOPIC` | `pdf-jobs` | Job topic |
    /// | `KAFKA_PARTITIONS` | `1` | Partitions consumed / hashed into |
    /// | `KAFKA_START_OFFSET` | `latest` | `earliest` or `latest`, for uncommitted partitions |
    /// | `KAFKA_GROUP_ID` | `pdfq-consumers` | Consumer group owning committed offsets |
    /// | `KAFKA_OFFSET_DIR` | `.pdfq/offsets` | Where committed offsets are stored |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let brokers = lookup(ENV_KAFKA_BROKERS)
            .map(|raw| parse_brokers(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![KAFKA_BROKERS.to_string()]);

        let topic = lookup(ENV_KAFKA_TOPIC)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| KAFKA_TOPIC.to_string());

        let partitions = lookup(ENV_KAFKA_PARTITIONS)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(KAFKA_PARTITIONS)
            .max(1);

        let start_from = lookup(ENV_KAFKA_START_OFFSET)
            .and_then(|v| StartFrom::parse(&v))
            .unwrap_or_default();

        let group_id = lookup(ENV_KAFKA_GROUP_ID)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| KAFKA_GROUP_ID.to_string());

        let offset_dir = lookup(ENV_KAFKA_OFFSET_DIR)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(KAFKA_OFFSET_DIR));

        Self {
            brokers,
            topic,
            partitions,
            start_from,
            group_id,
            offset_dir,
        }
    }

    /// Set the broker list.
    pub fn with_brokers(mut self, brokers: Vec<String>) -> Self {
        self.brokers = brokers;
        self
    }

    /// Set the topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the partition count.
    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    /// Set the consumer start position.
    pub fn with_start_from(mut self, start_from: StartFrom) -> Self {
        self.start_from = start_from;
        self
    }

    /// Set the consumer group.
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    /// Set the committed-offset directory.
    pub fn with_offset_dir(mut self, offset_dir: impl Into<PathBuf>) -> Self {
        self.offset_dir = offset_dir.into();
        self
    }
}

/// Split a comma-separated broker list, dropping blanks.
pub fn parse_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = BrokerConfig::from_lookup(|_| None);
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.brokers, vec!["localhost:9092"]);
        assert_eq!(config.topic, "pdf-jobs");
        assert_eq!(config.partitions, 1);
        assert_eq!(config.start_from, StartFrom::Latest);
        assert_eq!(config.group_id, "pdfq-consumers");
        assert_eq!(config.offset_dir, PathBuf::from(".pdfq/offsets"));
    }

    #[test]
    fn test_broker_list_is_split() {
        let config = BrokerConfig::from_lookup(lookup_from(&[(
            "KAFKA_BROKERS",
            "kafka-1:9092, kafka-2:9092,,kafka-3:9092",
        )]));
        assert_eq!(
            config.brokers,
            vec!["kafka-1:9092", "kafka-2:9092", "kafka-3:9092"]
        );
    }

    #[test]
    fn test_blank_broker_list_falls_back() {
        let config = BrokerConfig::from_lookup(lookup_from(&[("KAFKA_BROKERS", " , ")]));
        assert_eq!(config.brokers, vec!["localhost:9092"]);
    }

    #[test]
    fn test_overrides() {
        let config = BrokerConfig::from_lookup(lookup_from(&[
            ("KAFKA_TOPIC", "pdf-jobs-staging"),
            ("KAFKA_PARTITIONS", "6"),
            ("KAFKA_START_OFFSET", "Earliest"),
            ("KAFKA_GROUP_ID", "pdf-workers-eu"),
            ("KAFKA_OFFSET_DIR", "/var/lib/pdfq/offsets"),
        ]));
        assert_eq!(config.topic, "pdf-jobs-staging");
        assert_eq!(config.partitions, 6);
        assert_eq!(config.start_from, StartFrom::Earliest);
        assert_eq!(config.group_id, "pdf-workers-eu");
        assert_eq!(config.offset_dir, PathBuf::from("/var/lib/pdfq/offsets"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = BrokerConfig::from_lookup(lookup_from(&[
            ("KAFKA_PARTITIONS", "many"),
            ("KAFKA_START_OFFSET", "middle"),
            ("KAFKA_GROUP_ID", "  "),
        ]));
        assert_eq!(config.partitions, 1);
        assert_eq!(config.start_from, StartFrom::Latest);
        assert_eq!(config.group_id, "pdfq-consumers");
    }

    #[test]
    fn test_zero_partitions_clamped() {
        let config = BrokerConfig::from_lookup(lookup_from(&[("KAFKA_PARTITIONS", "0")]));
        assert_eq!(config.partitions, 1);
        assert_eq!(BrokerConfig::default().with_partitions(0).partitions, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = BrokerConfig::default()
            .with_brokers(vec!["broker:29092".into()])
            .with_topic("other")
            .with_partitions(3)
            .with_start_from(StartFrom::Earliest)
            .with_group_id("replay")
            .with_offset_dir("/tmp/offsets");
        assert_eq!(config.group_id, "replay");
        assert_eq!(config.offset_dir, PathBuf::from("/tmp/offsets"));
        assert_eq!(config.brokers, vec!["broker:29092"]);
        assert_eq!(config.topic, "other");
        assert_eq!(config.partitions, 3);
        assert_eq!(config.start_from, StartFrom::Earliest);
    }
}
