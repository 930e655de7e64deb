//! # World Module
//!
//! The spatial index of loaded chunks and the load/unload lifecycle around it.
//!
//! ## Concurrency
//!
//! - The index map is behind an `MtResource`: lookups take it shared, and only the
//!   insert/erase moments take it exclusively. Generation happens before the
//!   insert, outside the index lock, so loads of different positions proceed in
//!   parallel.
//! - Each chunk has its own `MtResource`, shared by neighbor readers and taken
//!   exclusively by the edit path and by loading.
//! - `unload_chunk` must only run while no mesh worker is mid-round; the chunk
//!   manager calls it strictly between rounds.
//!
//! ## Ownership
//!
//! A chunk is reachable through the index or sits in the pool, never both. Index
//! entries carry the pool handle issued when the chunk was acquired.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::Point3;

use super::block::block_side::BlockSide;
use super::chunk::{neighbor_position, Chunk, LoadLevel};
use super::chunk_pool::{ChunkHandle, ChunkPool};
use super::chunk_store::ChunkStore;
use super::generation::WorldGenerator;
use crate::config::WorldBounds;
use crate::core::MtResource;
use crate::error::ChunkIoError;

/// An entry of the spatial index.
pub struct IndexedChunk {
    /// Pool handle of the chunk's current tenancy
    pub handle: ChunkHandle,
    /// The chunk itself
    pub chunk: MtResource<Chunk>,
    /// Set by any worker whose range covered the position this round
    touched: AtomicBool,
}

impl IndexedChunk {
    /// Records that a worker's range covered this chunk.
    pub fn touch(&self) {
        self.touched.store(true, Ordering::Release);
    }

    /// Returns `true` if a worker covered this chunk since the last reset.
    pub fn is_touched(&self) -> bool {
        self.touched.load(Ordering::Acquire)
    }

    fn reset_touched(&self) {
        self.touched.store(false, Ordering::Release);
    }
}

/// The set of loaded chunks and the machinery to load and unload them.
pub struct World {
    /// The collection of all loaded chunks in the world, indexed by their position
    index: MtResource<HashMap<Point3<i32>, Arc<IndexedChunk>>>,
    pool: Mutex<ChunkPool>,
    generator: Arc<dyn WorldGenerator>,
    store: Option<ChunkStore>,
    bounds: WorldBounds,
}

impl World {
    /// Creates a world with no chunks loaded.
    ///
    /// # Arguments
    /// * `generator` - A prepared generator
    /// * `store` - Optional persistence consulted before the generator
    /// * `bounds` - Chunk positions outside these bounds are never loaded
    pub fn new(
        generator: Arc<dyn WorldGenerator>,
        store: Option<ChunkStore>,
        bounds: WorldBounds,
    ) -> Self {
        World {
            index: MtResource::new(HashMap::new()),
            pool: Mutex::new(ChunkPool::new()),
            generator,
            store,
            bounds,
        }
    }

    /// The configured world bounds.
    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    /// The generator used for chunks without a stored file.
    pub fn generator(&self) -> &dyn WorldGenerator {
        self.generator.as_ref()
    }

    /// The chunk store, if persistence is configured.
    pub fn store(&self) -> Option<&ChunkStore> {
        self.store.as_ref()
    }

    fn pool(&self) -> MutexGuard<'_, ChunkPool> {
        self.pool.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    pub fn get_chunk_at(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.index
            .get()
            .get(&position)
            .map(|entry| entry.chunk.clone())
    }

    /// Retrieves the index entry at the specified chunk coordinates.
    pub fn get_entry(&self, position: Point3<i32>) -> Option<Arc<IndexedChunk>> {
        self.index.get().get(&position).cloned()
    }

    /// Returns `true` if a chunk is indexed at the position.
    pub fn is_loaded(&self, position: Point3<i32>) -> bool {
        self.index.get().contains_key(&position)
    }

    /// Number of indexed chunks.
    pub fn loaded_count(&self) -> usize {
        self.index.get().len()
    }

    /// Positions of every indexed chunk.
    pub fn positions(&self) -> Vec<Point3<i32>> {
        self.index.get().keys().copied().collect()
    }

    /// Slots allocated by the pool so far (indexed plus free).
    pub fn pool_capacity(&self) -> usize {
        self.pool().capacity()
    }

    /// Chunks adjacent to `position`, indexed by `BlockSide`.
    pub fn neighbors_of(&self, position: Point3<i32>) -> [Option<MtResource<Chunk>>; 6] {
        let index = self.index.get();
        BlockSide::all().map(|side| {
            index
                .get(&neighbor_position(position, side))
                .map(|entry| entry.chunk.clone())
        })
    }

    /// Loads the chunk at `position` unless it is already indexed.
    ///
    /// The chunk comes from the store when one holds it, otherwise from the
    /// generator. Failures of either are logged and the chunk is loaded empty.
    ///
    /// # Returns
    /// `true` if this call inserted the chunk
    pub fn load_chunk(&self, position: Point3<i32>) -> bool {
        if !self.bounds.contains(position) || self.is_loaded(position) {
            return false;
        }

        let (handle, chunk) = self.pool().acquire(position);
        {
            let mut chunk = chunk.get_mut();
            chunk.retenant(position);
            self.populate(&mut chunk);
        }

        if !self.insert(position, handle, chunk) {
            return false;
        }

        self.force_neighbors_dirty(position);
        true
    }

    fn populate(&self, chunk: &mut Chunk) {
        let position = chunk.position;

        if let Some(store) = &self.store {
            match store.load_into(position, chunk) {
                Ok(true) => return,
                Ok(false) => {}
                Err(err) => {
                    log::warn!("Failed to load chunk {:?} from disk, loading it empty: {}", position, err);
                    chunk.clear();
                    chunk.set_load_level(LoadLevel::Decorated);
                    return;
                }
            }
        }

        // A panicking generator must not take the mesh worker down with it.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.generator
                .generate(chunk)
                .map_err(|err| format!("generating failed: {}", err))?;
            chunk.set_load_level(LoadLevel::BasicTerrain);
            self.generator
                .decorate(chunk)
                .map_err(|err| format!("decorating failed: {}", err))
        }));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason),
            Err(payload) => Some(format!("generator panicked: {}", panic_message(payload.as_ref()))),
        };
        if let Some(reason) = failure {
            log::warn!("Chunk {:?} {}, loading it empty", position, reason);
            chunk.clear();
        }
        chunk.set_load_level(LoadLevel::Decorated);
    }

    /// Inserts a populated chunk, or hands it back to the pool if another thread
    /// loaded the position first.
    fn insert(&self, position: Point3<i32>, handle: ChunkHandle, chunk: MtResource<Chunk>) -> bool {
        {
            let mut index = self.index.get_mut();
            if !index.contains_key(&position) {
                index.insert(
                    position,
                    Arc::new(IndexedChunk {
                        handle,
                        chunk,
                        touched: AtomicBool::new(true),
                    }),
                );
                return true;
            }
        }

        chunk.get_mut().set_load_level(LoadLevel::NotLoaded);
        if let Err(err) = self.pool().release(handle) {
            log::error!("Lost a chunk while discarding duplicate load of {:?}: {}", position, err);
        }
        false
    }

    /// Removes a chunk from the index and returns it to the pool.
    ///
    /// Unsaved edits are written to the store first; a failed save is logged.
    ///
    /// # Returns
    /// `true` if a chunk was indexed at the position
    pub fn unload_chunk(&self, position: Point3<i32>) -> bool {
        let Some(entry) = self.index.get_mut().remove(&position) else {
            return false;
        };

        {
            let mut chunk = entry.chunk.get_mut();
            if chunk.is_modified() {
                if let Some(store) = &self.store {
                    match store.save(&chunk) {
                        Ok(()) => chunk.mark_persisted(),
                        Err(err) => log::warn!("Failed to save evicted chunk {:?}: {}", position, err),
                    }
                }
            }
            chunk.set_load_level(LoadLevel::NotLoaded);
        }

        if let Err(err) = self.pool().release(entry.handle) {
            log::error!("Failed to return chunk {:?} to the pool: {}", position, err);
        }

        self.force_neighbors_dirty(position);
        true
    }

    /// Marks the up-to-six loaded neighbors of `position` dirty.
    pub fn force_neighbors_dirty(&self, position: Point3<i32>) {
        for neighbor in self.neighbors_of(position).into_iter().flatten() {
            neighbor.get().mark_dirty();
        }
    }

    /// Snapshots the index and clears every entry's touched flag.
    ///
    /// Entries still untouched after the next round are out of every worker's
    /// range and may be evicted.
    pub fn mark_eviction_candidates(&self) -> Vec<(Point3<i32>, Arc<IndexedChunk>)> {
        let index = self.index.get();
        index
            .iter()
            .map(|(position, entry)| {
                entry.reset_touched();
                (*position, entry.clone())
            })
            .collect()
    }

    /// Unloads every candidate no worker touched.
    ///
    /// # Returns
    /// The evicted positions
    pub fn evict_untouched(&self, candidates: Vec<(Point3<i32>, Arc<IndexedChunk>)>) -> Vec<Point3<i32>> {
        candidates
            .into_iter()
            .filter(|(_, entry)| !entry.is_touched())
            .filter_map(|(position, _)| self.unload_chunk(position).then_some(position))
            .collect()
    }

    /// Unloads every chunk, saving unsaved edits.
    pub fn unload_all(&self) {
        for position in self.positions() {
            self.unload_chunk(position);
        }
    }

    /// Writes every loaded chunk to the store.
    ///
    /// # Returns
    /// The number of chunks written, 0 if no store is configured
    ///
    /// # Errors
    /// The first failed write; chunks after it are not attempted
    pub fn save_all(&self) -> Result<usize, ChunkIoError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let entries: Vec<Arc<IndexedChunk>> = self.index.get().values().cloned().collect();
        for entry in &entries {
            let mut chunk = entry.chunk.get_mut();
            store.save(&chunk)?;
            chunk.mark_persisted();
        }
        Ok(entries.len())
    }

    /// Loads every stored chunk inside the world bounds that is not loaded yet.
    ///
    /// With `complete_or_nothing`, the first unreadable chunk unloads everything
    /// loaded by this call and the error is returned. Otherwise unreadable chunks
    /// are logged and skipped.
    ///
    /// # Returns
    /// The number of chunks loaded
    pub fn load_saved_region(&self, complete_or_nothing: bool) -> Result<usize, ChunkIoError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let mut loaded = Vec::new();
        for position in store.stored_positions()? {
            if !self.bounds.contains(position) || self.is_loaded(position) {
                continue;
            }

            let (handle, chunk) = self.pool().acquire(position);
            let result = {
                let mut chunk = chunk.get_mut();
                chunk.retenant(position);
                store.load_into(position, &mut chunk)
            };

            match result {
                Ok(true) => {
                    if self.insert(position, handle, chunk) {
                        self.force_neighbors_dirty(position);
                        loaded.push(position);
                    }
                }
                Ok(false) => self.discard(position, handle, &chunk),
                Err(err) if complete_or_nothing => {
                    self.discard(position, handle, &chunk);
                    for position in loaded {
                        self.unload_chunk(position);
                    }
                    return Err(err);
                }
                Err(err) => {
                    log::warn!("Skipping unreadable stored chunk {:?}: {}", position, err);
                    self.discard(position, handle, &chunk);
                }
            }
        }

        Ok(loaded.len())
    }

    fn discard(&self, position: Point3<i32>, handle: ChunkHandle, chunk: &MtResource<Chunk>) {
        chunk.get_mut().set_load_level(LoadLevel::NotLoaded);
        if let Err(err) = self.pool().release(handle) {
            log::error!("Failed to return chunk {:?} to the pool: {}", position, err);
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
