//! Storage substrate seam.
//!
//! The hierarchical container engine itself is not part of this crate's
//! core: the writer only needs the narrow primitive set captured by
//! [`ContainerStore`]. Any compliant engine offering named groups, chunked
//! fixed-extent datasets, attributes and object references can be plugged
//! in; [`MemStore`] is the in-tree engine used by the tests.

mod mem;

use std::path::Path;

use crate::util::Result;

pub use mem::MemStore;

/// Opaque handle to a group or dataset inside a store.
pub type NodeId = u64;

/// Indirect value identifying another node in the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef(pub NodeId);

/// Element types the writer creates datasets of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// 64-bit float samples.
    Float64,
    /// UTF-16 code units of an encoded string.
    Uint16,
    /// Object references.
    Reference,
}

/// Scalar attribute values the writer tags nodes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Int(i64),
}

/// Narrow contract the writer requires of a hierarchical container engine.
///
/// One store instance owns one output file for one write session. All
/// mutation is in-memory until [`flush`](ContainerStore::flush); the first
/// 512 bytes of the file are reserved for the caller to overwrite.
pub trait ContainerStore: Sized {
    /// Create the backing file; fails if the path already exists.
    fn create(path: &Path) -> Result<Self>;

    /// Root group handle.
    fn root(&self) -> NodeId;

    /// Look up a child group, creating it if absent. Idempotent.
    fn ensure_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId>;

    /// Create a fixed-extent chunked dataset. The extent never changes
    /// afterwards; `chunk_len` declares the storage granularity.
    fn create_dataset(
        &mut self,
        parent: NodeId,
        name: &str,
        element: ElementType,
        extent: u64,
        chunk_len: u64,
    ) -> Result<NodeId>;

    /// Write or overwrite a named attribute on a group or dataset.
    fn write_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> Result<()>;

    /// Write a contiguous float64 hyperslab at `offset`.
    fn write_f64_slab(&mut self, dataset: NodeId, offset: u64, samples: &[f64]) -> Result<()>;

    /// Write the full contents of a uint16 dataset.
    fn write_u16(&mut self, dataset: NodeId, values: &[u16]) -> Result<()>;

    /// Create an object reference to a node.
    fn object_ref(&mut self, node: NodeId) -> Result<ObjectRef>;

    /// Write a single object reference into a 1x1 reference dataset.
    fn write_ref(&mut self, dataset: NodeId, value: ObjectRef) -> Result<()>;

    /// Persist the container to the backing file (after the reserved
    /// leading block).
    fn flush(&mut self) -> Result<()>;
}
