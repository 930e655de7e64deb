//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block type definitions, block face handling and texture lookups.

use block_side::BlockSide;
use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The fixed-width integer stored per cell of a chunk grid and in chunk files.
pub type BlockId = u16;

/// The identifier of an empty cell.
pub const EMPTY_BLOCK: BlockId = 0;

/// Maps each block type to its corresponding texture indices for each face.
///
/// The outer array is indexed by `BlockType` as a `usize`.
/// The inner array contains 6 texture indices, one for each face in the order:
/// [Front, Back, Bottom, Top, Left, Right]
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u32; 6]; 8] = [
    [0, 0, 0, 0, 0, 0], // AIR (never meshed)
    [1, 1, 1, 1, 1, 1], // DIRT
    [2, 2, 1, 3, 2, 2], // GRASS (top: 3, bottom: 1, sides: 2)
    [0, 0, 0, 0, 0, 0], // WOOD
    [4, 4, 4, 4, 4, 4], // WHITE
    [5, 5, 5, 5, 5, 5], // STONE
    [6, 6, 6, 6, 6, 6], // GLASS
    [7, 7, 7, 7, 7, 7], // SAND
];

/// Returns `true` if the identifier names a non-empty cell.
#[inline]
pub fn is_filled(id: BlockId) -> bool {
    id != EMPTY_BLOCK
}

/// Returns `true` if the identifier hides faces pointing into it.
///
/// Identifiers without a known `BlockType` are treated as opaque.
#[inline]
pub fn is_opaque(id: BlockId) -> bool {
    match BlockType::from_id(id) {
        Some(block_type) => block_type.is_opaque(),
        None => is_filled(id),
    }
}

/// Gets the texture index for one face of a block identifier.
///
/// Unknown identifiers fall back to texture 0.
pub fn texture_index(id: BlockId, side: BlockSide) -> u32 {
    match BlockType::from_id(id) {
        Some(block_type) => BLOCK_TYPE_TO_TEXTURE_INDICES[block_type as usize][side as usize],
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_opaque_with_fallback_texture() {
        assert!(is_opaque(1234));
        assert_eq!(texture_index(1234, BlockSide::TOP), 0);
    }

    #[test]
    fn grass_top_differs_from_sides() {
        let grass = BlockType::GRASS.id();
        assert_ne!(
            texture_index(grass, BlockSide::TOP),
            texture_index(grass, BlockSide::FRONT)
        );
    }

    #[test]
    fn empty_block_is_neither_filled_nor_opaque() {
        assert!(!is_filled(EMPTY_BLOCK));
        assert!(!is_opaque(EMPTY_BLOCK));
        assert!(is_filled(BlockType::GLASS.id()));
        assert!(!is_opaque(BlockType::GLASS.id()));
    }
}
