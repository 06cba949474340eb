//! # pdfq-queue
//!
//! Message transport for pdfq jobs.
//!
//! This crate provides:
//! - [`BrokerConfig`], the one place both binaries read broker settings from
//! - [`KafkaSource`], a [`MessageSource`](pdfq_core::MessageSource) that merges
//!   one stream consumer per topic partition
//! - [`KafkaPublisher`], a [`MessageSink`](pdfq_core::MessageSink) keyed by job id
//! - [`FileOffsetStore`], the per-group committed offsets a restarted
//!   [`KafkaSource`] resumes from
//! - [`memory_queue`], an in-process channel pair with the same traits, for
//!   tests and local runs without a broker
//!
//! ## Example
//!
//! ```ignore
//! use pdfq_core::MessageSource;
//! use pdfq_queue::{BrokerConfig, KafkaSource};
//!
//! let config = BrokerConfig::from_env();
//! let mut source = KafkaSource::connect(&config).await?;
//! let message = source.pull().await?;
//! ```

pub mod config;
pub mod kafka;
pub mod memory;
pub mod offsets;

pub use config::{BrokerConfig, StartFrom};
pub use kafka::{partition_for_key, resume_offset, KafkaPublisher, KafkaSource};
pub use memory::{memory_queue, MemoryPublisher, MemorySource};
pub use offsets::FileOffsetStore;
