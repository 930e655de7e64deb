//! # Voxel World Core
//!
//! This module contains the in-memory representation of the block world.
//!
//! ## Architecture
//!
//! * **Block**: block identifiers, types, faces and texture lookups
//! * **Chunk**: fixed-size 3D grids of blocks with cached geometry
//! * **Chunk Pool**: reuse of chunk allocations across load/unload cycles
//! * **Chunk Store**: per-chunk files for persistence
//! * **Generation**: pluggable world generators selected by name
//! * **World**: the spatial index and the load/unload lifecycle
//!
//! ## Data Flow
//!
//! 1. A mesh worker asks the world for a chunk position inside its range
//! 2. The world takes a chunk from the pool and fills it from the store or the generator
//! 3. The chunk is indexed and its neighbors are marked dirty
//! 4. Edits mark chunks dirty; workers rebuild their geometry in the next round

pub mod block;
pub mod chunk;
pub mod chunk_pool;
pub mod chunk_store;
pub mod generation;
pub mod world;
