//! # Chunk Creation Module
//!
//! This module provides a sequential writer that overwrites a chunk's grid cell by
//! cell in storage order. Generators and the chunk reader use it to repopulate a
//! pooled chunk without going through `set_block` (which would flag every cell as
//! an edit).
//!
//! The writer keeps the solid bit vector and block count consistent with the grid
//! as blocks are pushed, and bumps the chunk revision once when it finishes.

use cgmath::Point3;

use super::{Chunk, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z, CHUNK_SIZE};
use crate::engine_state::voxels::block::{is_filled, BlockId, EMPTY_BLOCK};

/// A cursor that overwrites a chunk's cells in x-outer, y-middle, z-inner order.
pub(super) struct ChunkCreationIterator<'a> {
    chunk: &'a mut Chunk,
    /// Index of the next cell to be written
    cursor: usize,
    /// Current X position within the chunk
    local_x: usize,
    /// Current Y position within the chunk
    local_y: usize,
    /// Current Z position within the chunk
    local_z: usize,
    /// Non-empty cells written so far
    block_count: usize,
}

impl<'a> ChunkCreationIterator<'a> {
    /// Starts overwriting `chunk` from its first cell.
    pub fn new(chunk: &'a mut Chunk) -> Self {
        ChunkCreationIterator {
            chunk,
            cursor: 0,
            local_x: 0,
            local_y: 0,
            local_z: 0,
            block_count: 0,
        }
    }

    /// The local coordinate the next pushed block will land on.
    ///
    /// # Returns
    /// `None` once every cell has been written
    pub fn next_position(&self) -> Option<Point3<usize>> {
        (self.cursor < CHUNK_SIZE).then(|| Point3::new(self.local_x, self.local_y, self.local_z))
    }

    /// Writes a block at the current position and advances the cursor.
    ///
    /// Blocks pushed after the last cell are ignored.
    pub fn push_block(&mut self, id: BlockId) {
        if self.cursor >= CHUNK_SIZE {
            return;
        }

        let filled = is_filled(id);
        self.chunk.blocks[self.cursor] = id;
        self.chunk.solid_array.set(self.cursor, filled);
        if filled {
            self.block_count += 1;
        }
        self.cursor += 1;

        self.local_z += 1;
        if self.local_z == CHUNK_DIMENSION_Z {
            self.local_z = 0;
            self.local_y += 1;
            if self.local_y == CHUNK_DIMENSION_Y {
                self.local_y = 0;
                self.local_x += 1;
            }
        }
    }

    /// Pads any unwritten cells with air and publishes the new block count.
    pub fn finish(mut self) {
        while self.cursor < CHUNK_SIZE {
            self.push_block(EMPTY_BLOCK);
        }
        self.chunk.block_count = self.block_count;
        *self.chunk.revision.get_mut() += 1;
    }
}
