//! # pdfq-core
//!
//! Core types, traits, and abstractions for the pdfq extraction pipeline.
//!
//! This crate provides the job model shared by the producer and the consumer,
//! the error type every other pdfq crate returns, and the trait seams for the
//! external collaborators (message broker, text extraction service, result
//! sink).

pub mod builder;
pub mod defaults;
pub mod error;
pub mod job;
pub mod logging;
pub mod outcome;
pub mod traits;

// Re-export commonly used types at crate root
pub use builder::{build_job, generate_job_id, JobBuilder};
pub use error::{Error, Result};
pub use job::{FileDescriptor, Job};
pub use outcome::{ExtractedText, FileOutcome};
pub use traits::*;
