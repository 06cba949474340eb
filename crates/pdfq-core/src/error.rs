//! Error types for pdfq.

use thiserror::Error;

/// Result type alias using pdfq's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pdfq operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inbound message payload is not a well-formed job
    #[error("Decode error: {0}")]
    Decode(String),

    /// Job decoded but its shape is invalid (path/name list mismatch, no files)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Queue pull failed for a reason other than cancellation
    #[error("Queue read error: {0}")]
    TransientRead(String),

    /// Consumption was cancelled
    #[error("Consumption cancelled")]
    Cancelled,

    /// Text extraction for a single file failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The file itself cannot be extracted (unreadable, empty, not a PDF);
    /// repeating the call will not help
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// File is not of the expected document type
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    /// Publishing a message to the broker failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Broker connection or client setup failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error signals that consumption was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether the message that produced this error should be considered
    /// handled (dropped) rather than fatal to the consumer loop.
    pub fn is_message_level(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Validation(_))
    }

    /// Whether repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientRead(_)
                | Error::Extraction(_)
                | Error::Publish(_)
                | Error::Queue(_)
                | Error::Request(_)
                | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
