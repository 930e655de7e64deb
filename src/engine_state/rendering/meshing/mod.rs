//! Mesh generation for voxel chunks.
//!
//! This module converts a chunk's block grid into a vertex list with per-face
//! visibility culling. Each visible face becomes one quad, emitted as two
//! triangles (six vertices), in the order the chunk's non-empty cells are stored
//! and then by side (front, back, bottom, top, left, right).
//!
//! # Culling rule
//! A face is dropped only when the cell it looks into is non-empty and opaque.
//! Cells across the chunk boundary are read from the neighbor supplied by the
//! caller; when that neighbor is not loaded the face is kept.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::{Chunk, NeighborLookup, CHUNK_EXTENT};

use super::Vertex;

mod face;

pub use face::Face;

/// Builds the culled vertex list of a chunk.
pub fn cull_faces(chunk: &Chunk, neighbors: &impl NeighborLookup) -> Vec<Vertex> {
    let mut vertices = Vec::new();

    for (cell, block_id) in chunk.iter_blocks() {
        for side in BlockSide::all() {
            if !is_face_hidden(chunk, neighbors, cell, side) {
                Face::new(cell, block_id, side).emit(&mut vertices);
            }
        }
    }

    vertices
}

/// Returns `true` if the face on `side` of `cell` looks into an opaque block.
fn is_face_hidden(
    chunk: &Chunk,
    neighbors: &impl NeighborLookup,
    cell: Point3<usize>,
    side: BlockSide,
) -> bool {
    let offset = side.offset();
    let target = [
        cell.x as i32 + offset.x,
        cell.y as i32 + offset.y,
        cell.z as i32 + offset.z,
    ];

    let inside = (0..3).all(|axis| target[axis] >= 0 && target[axis] < CHUNK_EXTENT[axis]);
    if inside {
        return chunk.is_opaque_at(target[0] as usize, target[1] as usize, target[2] as usize);
    }

    match neighbors.neighbor(side) {
        // Faces only step along one axis, so wrapping lands on the facing cell.
        Some(neighbor) => neighbor.is_opaque_at(
            target[0].rem_euclid(CHUNK_EXTENT[0]) as usize,
            target[1].rem_euclid(CHUNK_EXTENT[1]) as usize,
            target[2].rem_euclid(CHUNK_EXTENT[2]) as usize,
        ),
        None => false,
    }
}
