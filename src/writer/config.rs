//! Writer configuration supplied by the host alongside the target directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_MAX_CHUNK_LEN;

/// Session configuration. Hosts typically deserialize this from their own
/// request configuration; every field has a default so partial JSON works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Directory the output file is created in.
    pub target_dir: PathBuf,
    /// Ceiling on the per-dataset chunk length, in samples.
    pub max_chunk_len: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
        }
    }
}

impl WriterConfig {
    /// Config writing into `target_dir` with default limits.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            ..Self::default()
        }
    }
}
