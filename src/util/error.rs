//! Error types for the mat73 writer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for writer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller-supplied configuration (unsanitizable parameter,
    /// misaligned period or offset, duplicate catalog item).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Sampling configuration incompatible with the file period: no legal
    /// chunk length exists for the derived total length.
    #[error("No chunk length <= {max_chunk_len} divides total length {total_len}")]
    Capacity { total_len: u64, max_chunk_len: u64 },

    /// Write would run past the fixed extent of a dataset.
    #[error("Write to `{dataset}` out of bounds: offset {offset} + length {len} exceeds extent {extent}")]
    Bounds {
        dataset: String,
        offset: u64,
        len: u64,
        extent: u64,
    },

    /// Caller-requested abort, observed between catalog groups or items.
    #[error("Write cancelled by caller")]
    Cancelled,

    /// Operation invoked in the wrong session lifecycle state.
    #[error("Invalid session state: {0}")]
    State(&'static str),

    /// Target output file already exists.
    #[error("Target file already exists: {0}")]
    TargetExists(PathBuf),

    /// Storage substrate failure (missing node, type mismatch, slot overflow).
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timestamp formatting error
    #[error("Time formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),
}

impl Error {
    /// Create a configuration error from a string.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a store error from a string.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, Error>;
