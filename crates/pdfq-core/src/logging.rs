//! Structured logging schema and field name constants for pdfq.
//!
//! All crates log with these field names so log aggregation tools can query
//! a job or a file across the producer, the consumer loop and every
//! extraction task.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue: dropped message, failed file, pull retry |
//! | INFO  | Lifecycle events (startup, shutdown, drain), per-file completions |
//! | DEBUG | Decision points, config choices, text previews |
//! | TRACE | Per-attempt and per-permit detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "queue", "jobs", "producer"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "consumer", "orchestrator", "tika", "pdftotext", "publisher"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "pull", "handle", "extract", "drain", "publish"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job identifier carried in the message key and payload.
pub const JOB_ID: &str = "job_id";

/// Display name of a file within a job.
pub const FILE_NAME: &str = "file_name";

/// Absolute path of a file within a job.
pub const FILE_PATH: &str = "file_path";

/// Kafka partition a message was read from.
pub const PARTITION: &str = "partition";

/// Kafka offset of a message.
pub const OFFSET: &str = "offset";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of characters of extracted text.
pub const CHAR_COUNT: &str = "char_count";

/// Number of file descriptors in a job.
pub const FILE_COUNT: &str = "file_count";

/// Number of extraction attempts made for a file.
pub const ATTEMPTS: &str = "attempts";

/// Number of extraction tasks still running.
pub const OUTSTANDING: &str = "outstanding";

/// Delay before the next retry, in milliseconds.
pub const RETRY_IN_MS: &str = "retry_in_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case_and_unique() {
        let fields = [
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            JOB_ID,
            FILE_NAME,
            FILE_PATH,
            PARTITION,
            OFFSET,
            DURATION_MS,
            CHAR_COUNT,
            FILE_COUNT,
            ATTEMPTS,
            OUTSTANDING,
            RETRY_IN_MS,
            SUCCESS,
            ERROR_MSG,
        ];
        for field in fields {
            assert!(
                field
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '_'),
                "field {field} is not snake_case"
            );
        }
        let unique: std::collections::HashSet<_> = fields.iter().collect();
        assert_eq!(unique.len(), fields.len());
    }
}
