//! # Engine State Module
//!
//! The chunk manager and the subsystems it coordinates.
//!
//! ## Key Components
//!
//! * `ChunkManager` - The facade owning one streaming world and its threads
//! * `priority_queue` - Out-of-band remesh requests from the edit path
//! * `rendering` - Vertex format, face culling and the geometry handoff
//! * `task_management` - Mesh workers, the management thread and round barriers
//! * `voxels` - Blocks, chunks, the chunk pool, generators, persistence and the spatial index
//!
//! ## Threads
//!
//! A `ChunkManager` runs `worker_count` mesh workers plus one management thread.
//! The consumer calls `try_swap` and `read_buffer` from its own thread; edits may
//! arrive from any thread. Nothing the consumer calls blocks on a round.
//!
//! ```no_run
//! use voxel_streamer::config::EngineConfig;
//! use voxel_streamer::engine_state::ChunkManager;
//! use voxel_streamer::engine_state::voxels::generation::GeneratorRegistry;
//!
//! let manager = ChunkManager::start(EngineConfig::default(), &GeneratorRegistry::new()).unwrap();
//! loop {
//!     if manager.try_swap() {
//!         let batch = manager.read_buffer();
//!         println!("{} chunks changed", batch.updated().len());
//!     }
//!     # break;
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::Point3;
use crossbeam_channel::Sender;
use log::{debug, info};

use rendering::GeometryBatch;
use task_management::{StreamingState, StreamingThreads};
use voxels::block::BlockId;
use voxels::chunk::{boundary_sides, neighbor_position, split_global_position, LoadLevel, CHUNK_EXTENT};
use voxels::chunk_store::ChunkStore;
use voxels::generation::GeneratorRegistry;
use voxels::world::World;

use crate::config::EngineConfig;
use crate::error::EngineError;

pub mod priority_queue;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Owns a streaming world and the threads that load and mesh it.
///
/// Dropping the manager shuts the threads down.
pub struct ChunkManager {
    state: Arc<StreamingState>,
    ready: Sender<()>,
    threads: Mutex<Option<StreamingThreads>>,
    spawn_point: Point3<i32>,
}

impl ChunkManager {
    /// Builds the world described by `config` and starts streaming around the
    /// spawn point.
    ///
    /// # Errors
    /// Invalid configuration, generator construction or preparation failures,
    /// chunk store failures and thread spawn failures are all fatal here.
    pub fn start(config: EngineConfig, registry: &GeneratorRegistry) -> Result<Self, EngineError> {
        config.validate()?;
        let bounds = config.bounds();

        let mut generator = registry.create(&config.generator)?;
        let spawn_point = generator.prepare(&bounds)?;
        info!(
            "Prepared `{}` generator with seed {}, spawn point {:?}",
            generator.name(),
            config.generator.seed,
            spawn_point
        );

        let store = match &config.save_directory {
            Some(directory) => Some(ChunkStore::open(directory)?),
            None => None,
        };
        let world = World::new(Arc::from(generator), store, bounds);

        if config.complete_or_nothing && world.store().is_some() {
            let preloaded = world.load_saved_region(true)?;
            info!("Preloaded {} stored chunks", preloaded);
        }

        let state = Arc::new(StreamingState::new(world, config));
        let (spawn_chunk, _) = split_global_position(spawn_point);
        state.set_viewer_chunk(spawn_chunk);

        let (ready, ready_rx) = crossbeam_channel::bounded(1);
        let threads = StreamingThreads::spawn(state.clone(), ready_rx)?;
        // The channel is fresh, so the first signal always fits.
        let _ = ready.try_send(());

        Ok(ChunkManager {
            state,
            ready,
            threads: Mutex::new(Some(threads)),
            spawn_point,
        })
    }

    /// Spawn point chosen by the generator, in block coordinates.
    pub fn spawn_point(&self) -> Point3<i32> {
        self.spawn_point
    }

    /// Moves the streaming center to the chunk containing `position` (block units).
    pub fn set_viewer_position(&self, position: Point3<f32>) {
        let chunk = Point3::new(
            (position.x / CHUNK_EXTENT[0] as f32).floor() as i32,
            (position.y / CHUNK_EXTENT[1] as f32).floor() as i32,
            (position.z / CHUNK_EXTENT[2] as f32).floor() as i32,
        );
        if chunk != self.state.viewer_chunk() {
            debug!("Viewer moved to chunk {:?}", chunk);
            self.state.set_viewer_chunk(chunk);
        }
    }

    /// Chunk the viewer is in.
    pub fn viewer_chunk(&self) -> Point3<i32> {
        self.state.viewer_chunk()
    }

    /// Reads the block at a global position.
    ///
    /// # Returns
    /// `None` if the containing chunk is not loaded
    pub fn get_block_at(&self, global: Point3<i32>) -> Option<BlockId> {
        let (position, local) = split_global_position(global);
        let chunk = self.state.world.get_chunk_at(position)?;
        let chunk = chunk.get();
        (chunk.position == position && chunk.load_level() == LoadLevel::Decorated)
            .then(|| chunk.get_block(local.x, local.y, local.z))
    }

    /// Replaces the block at a global position and schedules the remeshes the
    /// edit requires.
    ///
    /// Edits to a boundary cell dirty the neighbors across that boundary and queue
    /// them for a priority remesh as well.
    ///
    /// # Returns
    /// The previous identifier, or `None` if the containing chunk is not loaded or
    /// shutdown has begun
    ///
    /// # Errors
    /// `EngineError::OutOfBounds` if the position is outside the world bounds
    pub fn set_block_at(&self, global: Point3<i32>, id: BlockId) -> Result<Option<BlockId>, EngineError> {
        let (position, local) = split_global_position(global);
        if !self.state.world.bounds().contains(position) {
            return Err(EngineError::OutOfBounds(global));
        }
        if self.state.is_shutting_down() {
            return Ok(None);
        }
        let Some(chunk) = self.state.world.get_chunk_at(position) else {
            return Ok(None);
        };

        let old = {
            let mut chunk = chunk.get_mut();
            // The slot may have been evicted and reused between lookup and lock.
            if chunk.position != position || chunk.load_level() != LoadLevel::Decorated {
                return Ok(None);
            }
            if chunk.get_block(local.x, local.y, local.z) == id {
                return Ok(Some(id));
            }
            chunk.set_block(local.x, local.y, local.z, id)
        };

        let sides = boundary_sides(local);
        if !sides.is_empty() {
            self.state.world.force_neighbors_dirty(position);
        }
        self.request_priority_remesh(position);
        for side in sides {
            self.request_priority_remesh(neighbor_position(position, side));
        }
        Ok(Some(old))
    }

    /// Marks a loaded chunk dirty and queues it for a rebuild at the next swap.
    ///
    /// # Returns
    /// `false` if the chunk is not loaded, shutdown has begun, or the position
    /// was already queued
    pub fn request_priority_remesh(&self, position: Point3<i32>) -> bool {
        if self.state.is_shutting_down() {
            return false;
        }
        let Some(chunk) = self.state.world.get_chunk_at(position) else {
            return false;
        };
        chunk.get().mark_dirty();
        self.state.priority.push(position)
    }

    /// Publishes the geometry of the last completed round, if no round is running.
    ///
    /// Never blocks. On success queued priority remeshes are rebuilt into the new
    /// read buffer and the next round is released.
    pub fn try_swap(&self) -> bool {
        self.state.try_swap(&self.ready)
    }

    /// The geometry published by the last successful swap.
    pub fn read_buffer(&self) -> MutexGuard<'_, GeometryBatch> {
        self.state.buffers.read()
    }

    /// Returns `true` if a chunk is in the spatial index.
    pub fn is_loaded(&self, position: Point3<i32>) -> bool {
        self.state.world.is_loaded(position)
    }

    /// Number of chunks in the spatial index.
    pub fn loaded_chunk_count(&self) -> usize {
        self.state.world.loaded_count()
    }

    /// Number of rounds finished so far.
    pub fn rounds_completed(&self) -> u64 {
        self.state.rounds_completed()
    }

    /// Load radius of the next round.
    pub fn current_radius(&self) -> i32 {
        self.state.current_radius()
    }

    /// The configuration the manager runs with.
    pub fn config(&self) -> &EngineConfig {
        self.state.config()
    }

    /// Writes every loaded chunk to the chunk store.
    ///
    /// # Returns
    /// The number of chunks written; `0` when no store is configured
    ///
    /// # Errors
    /// The first failed write
    pub fn save_world(&self) -> Result<usize, EngineError> {
        let saved = self.state.world.save_all()?;
        info!("Saved {} chunks", saved);
        Ok(saved)
    }

    /// Stops the streaming threads, waits for them and unloads every chunk.
    ///
    /// Unsaved edits are written to the chunk store on the way out. Calling it
    /// again is a no-op.
    pub fn shutdown(&self) {
        let threads = self
            .threads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(threads) = threads {
            self.state.request_shutdown();
            threads.join();
            let loaded = self.loaded_chunk_count();
            self.state.world.unload_all();
            info!("Chunk manager shut down, released {} chunks", loaded);
        }
    }
}

impl Drop for ChunkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
