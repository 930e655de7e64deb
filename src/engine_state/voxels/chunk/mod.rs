//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a fixed-size 3D grid of block
//! identifiers together with the last renderable geometry built from it.
//!
//! ## Storage
//!
//! - `blocks`: one `BlockId` per cell, laid out x-outer, y-middle, z-inner. The
//!   same order is used when chunks are persisted.
//! - `solid_array`: a bit vector (1 bit per cell) marking non-empty cells, used to
//!   skip empty space while meshing.
//!
//! Pooled chunks keep their grid allocation between tenancies. Whoever re-tenants
//! a chunk overwrites every cell through `fill_with`, `clear` or the chunk reader.
//!
//! ## Dirty tracking
//!
//! Dirtiness is a pair of revision counters instead of a single flag. Every
//! mutation bumps `revision`; a rebuild records the revision it observed when it
//! started. A neighbor marking the chunk dirty while a rebuild is in flight
//! therefore leaves the chunk dirty for the next round rather than being lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLockReadGuard};

use bitvec::prelude::BitVec;
use cgmath::Point3;

use super::block::block_side::BlockSide;
use super::block::{is_filled, is_opaque, BlockId, EMPTY_BLOCK};
use crate::engine_state::rendering::{meshing, Vertex};
use chunk_creation::ChunkCreationIterator;
use chunk_iteration::ChunkBlockIterator;

mod chunk_creation;
pub mod chunk_io;
pub mod chunk_iteration;

/// Width of a chunk along X, in blocks.
pub const CHUNK_DIMENSION_X: usize = 16;
/// Height of a chunk along Y, in blocks.
pub const CHUNK_DIMENSION_Y: usize = 16;
/// Depth of a chunk along Z, in blocks.
pub const CHUNK_DIMENSION_Z: usize = 16;
/// The number of cells in one X slice of a chunk.
pub const CHUNK_PLANE_SIZE: usize = CHUNK_DIMENSION_Y * CHUNK_DIMENSION_Z;
/// The total number of cells in a chunk.
pub const CHUNK_SIZE: usize = CHUNK_DIMENSION_X * CHUNK_PLANE_SIZE;
/// Chunk dimensions as signed block extents.
pub const CHUNK_EXTENT: [i32; 3] = [
    CHUNK_DIMENSION_X as i32,
    CHUNK_DIMENSION_Y as i32,
    CHUNK_DIMENSION_Z as i32,
];

/// Generation progress of a chunk's block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadLevel {
    /// The grid holds stale or no data for the current position.
    NotLoaded,
    /// The base terrain pass has run.
    BasicTerrain,
    /// Every terrain pass has run; the chunk is ready for queries.
    Decorated,
}

/// Capability used by a rebuild to inspect the chunks across each face.
///
/// `Chunk` never reaches into the spatial index itself; the caller gathers the
/// neighbors it could lock and hands them over through this trait. `None` means
/// the neighbor is not loaded and boundary faces towards it are emitted.
pub trait NeighborLookup {
    /// The chunk adjacent across `side`, if it is loaded.
    fn neighbor(&self, side: BlockSide) -> Option<&Chunk>;
}

/// A lookup for a chunk with no loaded neighbors.
pub struct NoNeighbors;

impl NeighborLookup for NoNeighbors {
    fn neighbor(&self, _side: BlockSide) -> Option<&Chunk> {
        None
    }
}

impl NeighborLookup for [Option<&Chunk>; 6] {
    fn neighbor(&self, side: BlockSide) -> Option<&Chunk> {
        self[side as usize]
    }
}

impl NeighborLookup for [Option<RwLockReadGuard<'_, Chunk>>; 6] {
    fn neighbor(&self, side: BlockSide) -> Option<&Chunk> {
        self[side as usize].as_deref()
    }
}

/// A fixed-size cuboid of blocks, the unit of loading, unloading and meshing.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    /// Block identifiers in x-outer, y-middle, z-inner order.
    blocks: Box<[BlockId]>,
    /// One bit per cell, set where the cell is non-empty.
    solid_array: BitVec,
    /// Number of non-empty cells.
    block_count: usize,
    load_level: LoadLevel,
    /// Set by edits, cleared once the chunk has been persisted.
    modified: bool,
    revision: AtomicU64,
    meshed_revision: AtomicU64,
    geometry: Mutex<Arc<[Vertex]>>,
}

impl Chunk {
    /// Creates a new, completely empty chunk at the given chunk coordinate.
    ///
    /// The chunk starts dirty so that its first rebuild always runs.
    pub fn new(position: Point3<i32>) -> Self {
        Chunk {
            position,
            blocks: vec![EMPTY_BLOCK; CHUNK_SIZE].into_boxed_slice(),
            solid_array: BitVec::repeat(false, CHUNK_SIZE),
            block_count: 0,
            load_level: LoadLevel::NotLoaded,
            modified: false,
            revision: AtomicU64::new(1),
            meshed_revision: AtomicU64::new(0),
            geometry: Mutex::new(Arc::from(Vec::new())),
        }
    }

    /// Computes the grid index of a local coordinate.
    ///
    /// # Panics
    /// Panics if any coordinate is outside the chunk. Local coordinates come
    /// from engine code, so an out-of-range value is a caller bug.
    #[inline]
    pub fn block_index(x: usize, y: usize, z: usize) -> usize {
        assert!(
            x < CHUNK_DIMENSION_X && y < CHUNK_DIMENSION_Y && z < CHUNK_DIMENSION_Z,
            "local block coordinate ({x}, {y}, {z}) is outside the chunk"
        );
        (x * CHUNK_DIMENSION_Y + y) * CHUNK_DIMENSION_Z + z
    }

    /// Inverse of `block_index`.
    #[inline]
    pub fn local_position(index: usize) -> Point3<usize> {
        Point3::new(
            index / CHUNK_PLANE_SIZE,
            (index / CHUNK_DIMENSION_Z) % CHUNK_DIMENSION_Y,
            index % CHUNK_DIMENSION_Z,
        )
    }

    /// Gets the block at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[Self::block_index(x, y, z)]
    }

    /// Replaces the block at the specified chunk-relative coordinates.
    ///
    /// Keeps the block count and solid bits in step and marks the chunk dirty
    /// and modified. Remeshing is left to the mesh workers.
    ///
    /// # Returns
    /// The identifier previously stored in the cell
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, id: BlockId) -> BlockId {
        let index = Self::block_index(x, y, z);
        let old = self.write_cell(index, id);
        *self.revision.get_mut() += 1;
        self.modified = true;
        old
    }

    /// Replaces a cell during generation.
    ///
    /// Unlike `set_block` this is not an edit: the chunk is marked dirty but not
    /// modified, so generated content is never written back to the store.
    pub fn fill_cell(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        let index = Self::block_index(x, y, z);
        if self.write_cell(index, id) != id {
            *self.revision.get_mut() += 1;
        }
    }

    fn write_cell(&mut self, index: usize, id: BlockId) -> BlockId {
        let old = std::mem::replace(&mut self.blocks[index], id);
        match (is_filled(old), is_filled(id)) {
            (false, true) => {
                self.block_count += 1;
                self.solid_array.set(index, true);
            }
            (true, false) => {
                self.block_count -= 1;
                self.solid_array.set(index, false);
            }
            _ => {}
        }
        old
    }

    /// Returns `true` if the cell hides faces pointing into it.
    #[inline]
    pub fn is_opaque_at(&self, x: usize, y: usize, z: usize) -> bool {
        let index = Self::block_index(x, y, z);
        self.solid_array[index] && is_opaque(self.blocks[index])
    }

    /// Number of non-empty cells.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Returns `true` if every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// The raw grid in x-outer, y-middle, z-inner order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Iterates over every non-empty cell.
    pub fn iter_blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }

    /// Current generation progress.
    pub fn load_level(&self) -> LoadLevel {
        self.load_level
    }

    /// Records the generation progress.
    pub fn set_load_level(&mut self, load_level: LoadLevel) {
        self.load_level = load_level;
    }

    /// Returns `true` if edits have not been persisted yet.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clears the modified flag after a successful save.
    pub fn mark_persisted(&mut self) {
        self.modified = false;
    }

    /// Returns `true` if the grid changed since the last completed rebuild.
    pub fn is_dirty(&self) -> bool {
        self.revision.load(Ordering::Acquire) != self.meshed_revision.load(Ordering::Acquire)
    }

    /// Flags the chunk for a rebuild.
    ///
    /// Takes `&self` so neighbors can be flagged while other threads hold shared
    /// guards on them.
    pub fn mark_dirty(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// The block coordinate of this chunk's local origin.
    pub fn world_origin(&self) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_EXTENT[0],
            self.position.y * CHUNK_EXTENT[1],
            self.position.z * CHUNK_EXTENT[2],
        )
    }

    /// The geometry produced by the last completed rebuild.
    pub fn geometry(&self) -> Arc<[Vertex]> {
        self.geometry_slot().clone()
    }

    fn geometry_slot(&self) -> MutexGuard<'_, Arc<[Vertex]>> {
        self.geometry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Regenerates the geometry of this chunk with face culling.
    ///
    /// A face is emitted unless the cell it looks into is non-empty and opaque,
    /// whether that cell is inside this chunk or inside the neighbor returned by
    /// `neighbors`. Faces towards an unloaded neighbor are always emitted.
    ///
    /// Only a shared guard is needed: the geometry slot and revision counters are
    /// interior-mutable, so neighbor readers are never blocked by a rebuild.
    ///
    /// # Returns
    /// The new geometry, also stored on the chunk
    pub fn rebuild_geometry(&self, neighbors: &impl NeighborLookup) -> Arc<[Vertex]> {
        let observed_revision = self.revision.load(Ordering::Acquire);

        let geometry: Arc<[Vertex]> = if self.block_count == 0 {
            Arc::from(Vec::new())
        } else {
            Arc::from(meshing::cull_faces(self, neighbors))
        };

        *self.geometry_slot() = geometry.clone();
        self.meshed_revision
            .fetch_max(observed_revision, Ordering::AcqRel);

        geometry
    }

    /// Prepares a pooled chunk for a new position.
    ///
    /// Block data is left untouched; the caller must overwrite it. Geometry is
    /// dropped and the chunk is dirty again.
    pub fn retenant(&mut self, position: Point3<i32>) {
        self.position = position;
        self.load_level = LoadLevel::NotLoaded;
        self.modified = false;
        *self.geometry.get_mut().unwrap_or_else(|p| p.into_inner()) = Arc::from(Vec::new());
        let revision = *self.revision.get_mut() + 1;
        *self.revision.get_mut() = revision;
        *self.meshed_revision.get_mut() = revision - 1;
    }

    /// Overwrites every cell with air.
    pub fn clear(&mut self) {
        self.fill_with(|_| EMPTY_BLOCK);
    }

    /// Overwrites every cell with the identifier returned for its local coordinate.
    ///
    /// Cells are visited in storage order (x outer, z inner).
    pub fn fill_with(&mut self, mut block_at: impl FnMut(Point3<usize>) -> BlockId) {
        let mut creation = ChunkCreationIterator::new(self);
        while let Some(position) = creation.next_position() {
            creation.push_block(block_at(position));
        }
        creation.finish();
    }

    /// Overwrites every cell from identifiers given in storage order.
    pub(crate) fn fill_from_ids(&mut self, ids: impl IntoIterator<Item = BlockId>) {
        let mut creation = ChunkCreationIterator::new(self);
        for id in ids.into_iter().take(CHUNK_SIZE) {
            creation.push_block(id);
        }
        creation.finish();
    }
}

/// Splits a global block coordinate into its chunk coordinate and local offset.
pub fn split_global_position(global: Point3<i32>) -> (Point3<i32>, Point3<usize>) {
    let chunk = Point3::new(
        global.x.div_euclid(CHUNK_EXTENT[0]),
        global.y.div_euclid(CHUNK_EXTENT[1]),
        global.z.div_euclid(CHUNK_EXTENT[2]),
    );
    let local = Point3::new(
        global.x.rem_euclid(CHUNK_EXTENT[0]) as usize,
        global.y.rem_euclid(CHUNK_EXTENT[1]) as usize,
        global.z.rem_euclid(CHUNK_EXTENT[2]) as usize,
    );
    (chunk, local)
}

/// The faces of a chunk that a local coordinate lies against.
pub fn boundary_sides(local: Point3<usize>) -> Vec<BlockSide> {
    let mut sides = Vec::new();
    if local.x == 0 {
        sides.push(BlockSide::FRONT);
    }
    if local.x == CHUNK_DIMENSION_X - 1 {
        sides.push(BlockSide::BACK);
    }
    if local.y == 0 {
        sides.push(BlockSide::BOTTOM);
    }
    if local.y == CHUNK_DIMENSION_Y - 1 {
        sides.push(BlockSide::TOP);
    }
    if local.z == 0 {
        sides.push(BlockSide::LEFT);
    }
    if local.z == CHUNK_DIMENSION_Z - 1 {
        sides.push(BlockSide::RIGHT);
    }
    sides
}

/// The chunk coordinate adjacent across `side`.
pub fn neighbor_position(position: Point3<i32>, side: BlockSide) -> Point3<i32> {
    position + side.offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    fn filled(position: Point3<i32>, id: BlockId) -> Chunk {
        let mut chunk = Chunk::new(position);
        chunk.fill_with(|_| id);
        chunk
    }

    #[test]
    fn empty_chunk_meshes_to_nothing() {
        let chunk = Chunk::new(Point3::new(0, 0, 0));
        let geometry = chunk.rebuild_geometry(&NoNeighbors);
        assert!(geometry.is_empty());
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn single_block_without_neighbors_emits_six_faces() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.rebuild_geometry(&NoNeighbors);

        let old = chunk.set_block(0, 0, 0, BlockType::DIRT.id());
        assert_eq!(old, EMPTY_BLOCK);
        assert!(chunk.is_dirty());

        let geometry = chunk.rebuild_geometry(&NoNeighbors);
        assert_eq!(geometry.len(), 36);
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn set_block_tracks_block_count() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.set_block(1, 2, 3, BlockType::STONE.id());
        chunk.set_block(1, 2, 3, BlockType::DIRT.id());
        assert_eq!(chunk.block_count(), 1);
        assert_eq!(chunk.set_block(1, 2, 3, EMPTY_BLOCK), BlockType::DIRT.id());
        assert_eq!(chunk.block_count(), 0);
        assert!(chunk.is_modified());
    }

    #[test]
    #[should_panic(expected = "outside the chunk")]
    fn out_of_range_local_coordinate_panics() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.set_block(CHUNK_DIMENSION_X, 0, 0, 1);
    }

    #[test]
    fn emptied_chunk_rebuilds_to_empty_geometry() {
        let mut chunk = filled(Point3::new(0, 0, 0), BlockType::DIRT.id());
        assert!(!chunk.rebuild_geometry(&NoNeighbors).is_empty());
        chunk.clear();
        assert_eq!(chunk.block_count(), 0);
        assert!(chunk.rebuild_geometry(&NoNeighbors).is_empty());
    }

    #[test]
    fn opaque_neighbor_hides_boundary_face_but_unloaded_one_does_not() {
        let mut a = Chunk::new(Point3::new(0, 0, 0));
        a.set_block(CHUNK_DIMENSION_X - 1, 0, 0, BlockType::DIRT.id());
        let mut b = Chunk::new(Point3::new(1, 0, 0));
        b.set_block(0, 0, 0, BlockType::STONE.id());

        let mut neighbors: [Option<&Chunk>; 6] = [None; 6];
        neighbors[BlockSide::BACK as usize] = Some(&b);
        let culled = a.rebuild_geometry(&neighbors);
        assert_eq!(culled.len(), 30);

        a.mark_dirty();
        let unculled = a.rebuild_geometry(&NoNeighbors);
        assert_eq!(unculled.len(), 36);
    }

    #[test]
    fn glass_neighbor_does_not_hide_faces() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.set_block(4, 4, 4, BlockType::DIRT.id());
        chunk.set_block(5, 4, 4, BlockType::GLASS.id());
        let geometry = chunk.rebuild_geometry(&NoNeighbors);
        // Dirt keeps all six faces, glass loses the one against the dirt.
        assert_eq!(geometry.len(), (6 + 5) * 6);
    }

    #[test]
    fn two_full_chunks_share_no_boundary_faces() {
        let a = filled(Point3::new(0, 0, 0), BlockType::DIRT.id());
        let b = filled(Point3::new(1, 0, 0), BlockType::DIRT.id());

        let mut a_neighbors: [Option<&Chunk>; 6] = [None; 6];
        a_neighbors[BlockSide::BACK as usize] = Some(&b);
        let mut b_neighbors: [Option<&Chunk>; 6] = [None; 6];
        b_neighbors[BlockSide::FRONT as usize] = Some(&a);

        let face = BlockSide::BACK.packed_normal();
        let a_geometry = a.rebuild_geometry(&a_neighbors);
        assert!(a_geometry.iter().all(|v| v.normal() != face));

        let face = BlockSide::FRONT.packed_normal();
        let b_geometry = b.rebuild_geometry(&b_neighbors);
        assert!(b_geometry.iter().all(|v| v.normal() != face));

        // Five exposed sides of 16x16 quads remain on each chunk.
        assert_eq!(a_geometry.len(), 5 * CHUNK_PLANE_SIZE * 6);
    }

    #[test]
    fn mark_dirty_during_rebuild_is_not_lost() {
        let chunk = filled(Point3::new(0, 0, 0), BlockType::DIRT.id());
        let observed = chunk.revision.load(Ordering::Acquire);
        chunk.mark_dirty();
        // Simulates a rebuild that started before the mark landed.
        chunk.meshed_revision.fetch_max(observed, Ordering::AcqRel);
        assert!(chunk.is_dirty());
    }

    #[test]
    fn retenant_keeps_blocks_and_resets_state() {
        let mut chunk = filled(Point3::new(3, 3, 3), BlockType::SAND.id());
        chunk.rebuild_geometry(&NoNeighbors);
        chunk.set_load_level(LoadLevel::Decorated);

        chunk.retenant(Point3::new(-1, 0, 2));

        assert_eq!(chunk.position, Point3::new(-1, 0, 2));
        assert_eq!(chunk.load_level(), LoadLevel::NotLoaded);
        assert_eq!(chunk.block_count(), CHUNK_SIZE);
        assert!(chunk.geometry().is_empty());
        assert!(chunk.is_dirty());
        assert!(!chunk.is_modified());
    }

    #[test]
    fn split_global_position_handles_negative_coordinates() {
        let (chunk, local) = split_global_position(Point3::new(-1, 16, 33));
        assert_eq!(chunk, Point3::new(-1, 1, 2));
        assert_eq!(local, Point3::new(15, 0, 1));
    }

    #[test]
    fn local_position_inverts_block_index() {
        for index in [0, 1, 17, CHUNK_PLANE_SIZE + 3, CHUNK_SIZE - 1] {
            let p = Chunk::local_position(index);
            assert_eq!(Chunk::block_index(p.x, p.y, p.z), index);
        }
    }

    #[test]
    fn boundary_sides_reports_corners() {
        let sides = boundary_sides(Point3::new(0, CHUNK_DIMENSION_Y - 1, 5));
        assert_eq!(sides, vec![BlockSide::FRONT, BlockSide::TOP]);
        assert!(boundary_sides(Point3::new(4, 4, 4)).is_empty());
    }
}
