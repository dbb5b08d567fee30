//! Physical layout derivation: chunk planning and format-legal naming.

pub mod chunk;
pub mod name;

pub use chunk::ChunkPlan;
