//! Error types for rewind operations

use std::path::PathBuf;

/// Result type for rewind operations
pub type Result<T> = std::result::Result<T, RewindError>;

/// Error types for the recorder, replayer and tracer
#[derive(Debug, thiserror::Error)]
pub enum RewindError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The replay log could not be opened or created
    #[error("Failed to open replay log {path}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The performance trace file could not be created
    #[error("Failed to open trace file {path}: {source}")]
    OpenTrace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key was recorded more than once in the log being replayed
    #[error("Duplicate key in replay log: {0}")]
    DuplicateKey(String),

    /// A key was requested during replay that the log never recorded
    #[error("Key not present in replay log: {0}")]
    MissingKey(String),

    /// The log ends in the middle of a record
    #[error("Replay log truncated inside the record starting at byte {offset}")]
    TruncatedLog { offset: u64 },

    /// A live iterator yielded a different number of values than it reported
    #[error("Live iterator reported {declared} values but yielded {observed}")]
    CountMismatch { declared: usize, observed: usize },

    /// Decoded bytes do not form a valid value
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for RewindError {
    fn from(s: String) -> Self {
        RewindError::Other(s)
    }
}

impl From<&str> for RewindError {
    fn from(s: &str) -> Self {
        RewindError::Other(s.to_string())
    }
}
