//! # Chunk Iteration Module
//!
//! This module provides an iterator over the non-empty cells of a chunk. It scans
//! the chunk's solid bit vector, so runs of air are skipped a word at a time.

use cgmath::Point3;

use super::Chunk;
use crate::engine_state::voxels::block::BlockId;

/// An iterator over all non-empty cells of a chunk, in storage order.
pub struct ChunkBlockIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a Chunk,
    /// Next index of the solid array to inspect
    current_solid_offset: usize,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` positioned before the first cell.
    pub fn new(chunk_ref: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref,
            current_solid_offset: 0,
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = (Point3<usize>, BlockId);

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self
            .chunk_ref
            .solid_array
            .get(self.current_solid_offset..)?;
        let index = self.current_solid_offset + remaining.first_one()?;
        self.current_solid_offset = index + 1;
        Some((Chunk::local_position(index), self.chunk_ref.blocks[index]))
    }
}
