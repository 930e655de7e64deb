//! Geometry side of the streamer.
//!
//! This module turns chunks into vertex lists and hands them to the consumer:
//! - `meshing`: face-culled mesh generation
//! - `double_buffer`: the producer/consumer swap
//! - `mesh_cache`: the consumer's persistent view of the latest geometry

pub mod double_buffer;
pub mod mesh_cache;
pub mod meshing;
mod vertex;

pub use double_buffer::{DoubleBuffer, GeometryBatch};
pub use mesh_cache::MeshCache;
pub use vertex::{vertex_bytes, Vertex};
