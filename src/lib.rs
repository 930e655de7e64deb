#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streamer
//!
//! A multi-threaded voxel chunk streaming engine: chunks around a moving viewer are
//! generated or read from disk, meshed with face culling by a pool of worker
//! threads, and handed to a rendering consumer through a double buffer.
//!
//! ## Key Modules
//!
//! * `config` - Serde-backed engine configuration
//! * `core` - Shared resource wrappers used across threads
//! * `engine_state` - The chunk manager, voxels, meshing and task management
//! * `error` - Error types for every fallible surface
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_streamer::{ChunkManager, EngineConfig, GeneratorRegistry};
//!
//! voxel_streamer::init_logging();
//! let manager = ChunkManager::start(EngineConfig::default(), &GeneratorRegistry::new())?;
//! while manager.rounds_completed() < 8 {
//!     manager.try_swap();
//! }
//! manager.shutdown();
//! # Ok::<(), voxel_streamer::EngineError>(())
//! ```

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::{EngineConfig, GeneratorConfig, WorldBounds};
pub use engine_state::rendering::{GeometryBatch, MeshCache, Vertex};
pub use engine_state::voxels::block::{block_type::BlockType, BlockId, EMPTY_BLOCK};
pub use engine_state::voxels::generation::{GeneratorRegistry, WorldGenerator};
pub use engine_state::ChunkManager;
pub use error::EngineError;

/// Initializes the `env_logger` backend, writing to stdout and filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls leave the first logger in place.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let initialized = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if initialized {
        log::info!("Logger initialized");
    }
}
