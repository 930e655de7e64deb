//! Chunk memory pool.
//!
//! Unloaded chunks return here instead of being dropped, so streaming does not
//! reallocate a block grid for every chunk that enters the load radius. Slots are
//! addressed through generation-checked handles: releasing a slot bumps its
//! generation, which makes every handle issued for the previous tenancy stale.

use std::collections::VecDeque;

use cgmath::Point3;

use super::chunk::Chunk;
use crate::core::MtResource;
use crate::error::PoolError;

/// Handle to an acquired chunk slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    index: usize,
    generation: u32,
}

impl ChunkHandle {
    /// Slot index of the handle.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Tenancy generation of the handle.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A slot in the chunk pool.
struct PoolSlot {
    generation: u32,
    chunk: MtResource<Chunk>,
    in_use: bool,
}

/// A growable arena of chunks with a FIFO free list.
#[derive(Default)]
pub struct ChunkPool {
    slots: Vec<PoolSlot>,
    free_slots: VecDeque<usize>,
}

impl ChunkPool {
    /// Creates an empty pool. Slots are allocated on first demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a free chunk, or allocates one if none is free.
    ///
    /// A reused chunk keeps its previous block contents; the caller re-tenants
    /// and overwrites it.
    pub fn acquire(&mut self, position: Point3<i32>) -> (ChunkHandle, MtResource<Chunk>) {
        if let Some(index) = self.free_slots.pop_front() {
            let slot = &mut self.slots[index];
            slot.in_use = true;
            let handle = ChunkHandle {
                index,
                generation: slot.generation,
            };
            return (handle, slot.chunk.clone());
        }

        let index = self.slots.len();
        let chunk = MtResource::new(Chunk::new(position));
        self.slots.push(PoolSlot {
            generation: 0,
            chunk: chunk.clone(),
            in_use: true,
        });
        (
            ChunkHandle {
                index,
                generation: 0,
            },
            chunk,
        )
    }

    /// Returns a chunk to the pool.
    ///
    /// # Errors
    /// `PoolError::StaleHandle` if the slot was already released under this handle.
    pub fn release(&mut self, handle: ChunkHandle) -> Result<(), PoolError> {
        let slot = self.live_slot_mut(handle)?;
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push_back(handle.index);
        Ok(())
    }

    /// The chunk behind a handle, if the handle is still current.
    pub fn get(&self, handle: ChunkHandle) -> Option<MtResource<Chunk>> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.in_use && slot.generation == handle.generation)
            .map(|slot| slot.chunk.clone())
    }

    fn live_slot_mut(&mut self, handle: ChunkHandle) -> Result<&mut PoolSlot, PoolError> {
        match self.slots.get_mut(handle.index) {
            Some(slot) if slot.in_use && slot.generation == handle.generation => Ok(slot),
            _ => Err(PoolError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            }),
        }
    }

    /// Total number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots waiting for reuse.
    pub fn available(&self) -> usize {
        self.free_slots.len()
    }

    /// Number of slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_chunk_is_reused_with_its_contents() {
        let mut pool = ChunkPool::new();
        let (handle, chunk) = pool.acquire(Point3::new(0, 0, 0));
        chunk.get_mut().set_block(1, 1, 1, 7);
        pool.release(handle).unwrap();

        let (reused, chunk_again) = pool.acquire(Point3::new(4, 0, 0));
        assert_eq!(reused.index(), handle.index());
        assert_ne!(reused.generation(), handle.generation());
        assert!(chunk.ptr_eq(&chunk_again));
        assert_eq!(chunk_again.get().get_block(1, 1, 1), 7);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn stale_handle_is_detected() {
        let mut pool = ChunkPool::new();
        let (handle, _) = pool.acquire(Point3::new(0, 0, 0));
        pool.release(handle).unwrap();

        assert_eq!(
            pool.release(handle),
            Err(PoolError::StaleHandle {
                index: 0,
                generation: 0
            })
        );
        assert!(pool.get(handle).is_none());

        let (_current, _) = pool.acquire(Point3::new(1, 0, 0));
        assert!(pool.get(handle).is_none());
        assert!(pool.release(handle).is_err());
    }

    #[test]
    fn counts_track_acquire_and_release() {
        let mut pool = ChunkPool::new();
        let handles: Vec<_> = (0..3).map(|x| pool.acquire(Point3::new(x, 0, 0)).0).collect();
        assert_eq!(pool.in_use(), 3);
        pool.release(handles[1]).unwrap();
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.available(), 1);
    }
}
