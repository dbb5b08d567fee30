//! MAT-file v7.3 write pipeline.
//!
//! Split into focused submodules: skeleton construction, deferred text
//! registry, preamble, and the session state machine that sequences them.

pub mod config;
pub mod constants;
mod preamble;
mod session;
mod skeleton;
mod text;

pub use config::WriterConfig;
pub use constants::DEFAULT_MAX_CHUNK_LEN;
pub use preamble::PREAMBLE_LEN;
pub use session::{CancelToken, ProgressSink, Session, SessionState};

#[cfg(test)]
mod tests;
