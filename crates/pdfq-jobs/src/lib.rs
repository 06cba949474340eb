//! # pdfq-jobs
//!
//! PDF extraction pipeline for pdfq consumers.
//!
//! This crate provides:
//! - Per-file extraction tasks under a shared concurrency limit
//! - Drain of in-flight tasks for orderly shutdown
//! - A cancellable consumer loop with bounded pull backoff
//! - Tika and `pdftotext` extraction adapters
//!
//! ## Example
//!
//! ```ignore
//! use pdfq_jobs::{build_extractor, run_consumer, ExtractionConfig, Orchestrator, PullBackoff};
//! use pdfq_queue::{BrokerConfig, KafkaSource};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ExtractionConfig::from_env()?;
//! let orchestrator = Orchestrator::new(build_extractor(&config), &config);
//! let source = KafkaSource::connect(&BrokerConfig::from_env()).await?;
//!
//! let cancel = CancellationToken::new();
//! run_consumer(source, &orchestrator, cancel, PullBackoff::from_env()).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod consumer;
pub mod orchestrator;
pub mod sink;

// Re-export core types
pub use pdfq_core::*;

pub use adapters::{build_extractor, PdfToTextExtractor, TikaExtractor};
pub use config::{ExtractionConfig, ExtractorBackend, PullBackoff, RetryPolicy};
pub use consumer::{consume, run_consumer};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use sink::{LogSink, MemorySink};
