//! nmtscope error types

use std::path::PathBuf;
use thiserror::Error;

/// nmtscope error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact name could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Report collection failed
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Operation aborted through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to decode an artifact file name into a report identity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Wrong number of `_` tokens or a prefix other than `nmt`
    #[error("invalid file name format: {name}")]
    InvalidFormat { name: String },

    /// pid or timestamp token is not a positive integer
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Failure while collecting a new NMT report
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Report directory could not be created
    #[error("failed to create report directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Staging file could not be created or duplicated for the child
    #[error("failed to create report file in {}: {source}", dir.display())]
    CreateFile {
        dir: PathBuf,
        source: std::io::Error,
    },

    /// The command could not be started or waited on
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The command ran but did not exit successfully
    #[error("{command} exited with {status}")]
    ExitStatus {
        command: String,
        status: std::process::ExitStatus,
    },

    /// An artifact with the same (pid, timestamp) identity already exists
    #[error("report already exists: {}", path.display())]
    Duplicate { path: PathBuf },

    /// Staged output could not be renamed to its final name
    #[error("failed to move report into {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The command was killed after exceeding its time limit
    #[error("{command} did not finish within {secs}s")]
    TimedOut { command: String, secs: u64 },

    /// Shutdown requested while the command was running
    #[error("report generation cancelled")]
    Cancelled,
}

/// Result type alias for nmtscope operations
pub type Result<T> = std::result::Result<T, Error>;
