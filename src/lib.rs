//! # mat73
//!
//! Streaming writer producing MATLAB v7.3 MAT-files (a constrained profile
//! of a hierarchical binary container format) from time-windowed batches of
//! float64 samples.
//!
//! A host delivers readings grouped by catalog/resource/representation; the
//! writer pre-sizes one chunked dataset per catalog item, routes each batch
//! to its dataset at the batch's time offset, and satisfies the target
//! tool's compatibility rules: the fixed 512-byte preamble, MATLAB class
//! tagging and reference-based string storage. Authoring is append-only and
//! single-pass: one complete open -> write* -> close session per file.
//!
//! ## Modules
//!
//! - [`util`] - Error handling
//! - [`catalog`] - Host-facing data model
//! - [`layout`] - Chunk planning and physical naming
//! - [`store`] - Storage substrate seam ([`ContainerStore`]) and the
//!   in-memory engine
//! - [`writer`] - Session lifecycle, skeleton, text registry, preamble
//!
//! ## Example
//!
//! ```ignore
//! use mat73::prelude::*;
//!
//! let mut session: Session = Session::new(WriterConfig::new("/data/out"));
//! session.open(begin, file_period, sample_period, &items)?;
//! session.write(offset, &requests, &mut |done, total| {}, &CancelToken::new())?;
//! session.close()?;
//! ```

pub mod catalog;
pub mod layout;
pub mod store;
pub mod util;
pub mod writer;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogItem, Representation, Resource, WriteRequest};
pub use store::{ContainerStore, MemStore};
pub use util::{Error, Result};
pub use writer::{CancelToken, Session, SessionState, WriterConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogItem, Representation, Resource, WriteRequest};
    pub use crate::layout::ChunkPlan;
    pub use crate::store::{ContainerStore, MemStore};
    pub use crate::util::{Error, Result};
    pub use crate::writer::{CancelToken, ProgressSink, Session, SessionState, WriterConfig};
}
