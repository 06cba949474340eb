//! Centralized default constants for pdfq.
//!
//! **This module is the single source of truth** for shared default values.
//! The producer and the consumer both read broker settings from here, so the
//! two sides can never fall back to different addresses.

// =============================================================================
// BROKER
// =============================================================================

/// Environment variable holding a comma-separated `host:port` broker list.
pub const ENV_KAFKA_BROKERS: &str = "KAFKA_BROKERS";

/// Default broker address when `KAFKA_BROKERS` is unset.
pub const KAFKA_BROKERS: &str = "localhost:9092";

/// Environment variable for the job topic.
pub const ENV_KAFKA_TOPIC: &str = "KAFKA_TOPIC";

/// Default job topic.
pub const KAFKA_TOPIC: &str = "pdf-jobs";

/// Environment variable for the number of topic partitions.
pub const ENV_KAFKA_PARTITIONS: &str = "KAFKA_PARTITIONS";

/// Default partition count.
pub const KAFKA_PARTITIONS: u32 = 1;

/// Environment variable selecting where a fresh consumer starts reading.
pub const ENV_KAFKA_START_OFFSET: &str = "KAFKA_START_OFFSET";

/// Environment variable naming the consumer group that owns committed offsets.
pub const ENV_KAFKA_GROUP_ID: &str = "KAFKA_GROUP_ID";

/// Default consumer group.
pub const KAFKA_GROUP_ID: &str = "pdfq-consumers";

/// Environment variable for the directory holding committed offsets.
pub const ENV_KAFKA_OFFSET_DIR: &str = "KAFKA_OFFSET_DIR";

/// Default committed-offset directory, relative to the working directory.
pub const KAFKA_OFFSET_DIR: &str = ".pdfq/offsets";

/// Maximum time the broker may hold a fetch open waiting for data.
pub const KAFKA_FETCH_MAX_WAIT_MS: i32 = 500;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Environment variable for the permit pool capacity.
pub const ENV_PDF_MAX_CONCURRENT: &str = "PDF_MAX_CONCURRENT";

/// Default number of concurrent extraction calls, shared across all jobs.
pub const PDF_MAX_CONCURRENT: usize = 3;

/// Environment variable selecting the extraction backend (`tika` or `pdftotext`).
pub const ENV_PDF_EXTRACTOR: &str = "PDF_EXTRACTOR";

/// Environment variable for the Tika server base URL.
pub const ENV_TIKA_URL: &str = "TIKA_URL";

/// Default Tika server base URL.
pub const TIKA_URL: &str = "http://localhost:9998";

/// Environment variable for the optional per-call extraction timeout.
pub const ENV_EXTRACTION_TIMEOUT_SECS: &str = "EXTRACTION_TIMEOUT_SECS";

/// Environment variable for the number of retries after a failed extraction.
pub const ENV_EXTRACTION_MAX_RETRIES: &str = "EXTRACTION_MAX_RETRIES";

/// Default retries after a failed extraction. Zero means a failure is final.
pub const EXTRACTION_MAX_RETRIES: usize = 0;

/// First delay between extraction retries.
pub const EXTRACTION_RETRY_MIN_DELAY_MS: u64 = 1_000;

/// Upper bound on the delay between extraction retries.
pub const EXTRACTION_RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Per-command timeout for external extraction tools (seconds).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 60;

/// Page threshold for batch PDF extraction.
pub const LARGE_PDF_PAGE_THRESHOLD: usize = 100;

/// Pages per batch for large PDF extraction.
pub const PDF_BATCH_PAGES: usize = 50;

/// Number of characters of extracted text shown in debug previews.
pub const TEXT_PREVIEW_CHARS: usize = 200;

// =============================================================================
// CONSUMER LOOP
// =============================================================================

/// Environment variable for the first delay after a failed pull.
pub const ENV_PULL_BACKOFF_MIN_MS: &str = "PULL_BACKOFF_MIN_MS";

/// First delay after a failed pull.
pub const PULL_BACKOFF_MIN_MS: u64 = 100;

/// Environment variable for the delay ceiling between failed pulls.
pub const ENV_PULL_BACKOFF_MAX_MS: &str = "PULL_BACKOFF_MAX_MS";

/// Delay ceiling between failed pulls.
pub const PULL_BACKOFF_MAX_MS: u64 = 30_000;

// =============================================================================
// JOB MODEL
// =============================================================================

/// File extension accepted by the job builder.
pub const PDF_EXTENSION: &str = "pdf";

/// Prefix of generated job identifiers.
pub const JOB_ID_PREFIX: &str = "job";

/// Number of random bytes in a job id suffix (rendered as twice as many hex chars).
pub const JOB_ID_RANDOM_BYTES: usize = 4;
