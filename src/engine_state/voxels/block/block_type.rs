//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, opacity and random generation.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockId;

/// Enumerates all known block types in the voxel world.
///
/// The discriminant of each variant is its persisted `BlockId`. The `FromPrimitive`
/// derive allows conversion back from stored identifiers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u16)]
pub enum BlockType {
    /// An air block, which is empty and transparent.
    AIR = 0,

    /// A basic dirt block, used as a common building material.
    DIRT = 1,

    /// A grass block with different textures on top and sides.
    /// The top is green, sides have grass on dirt, and bottom is plain dirt.
    GRASS = 2,

    /// A wooden block with a bark texture on all sides.
    WOOD = 3,

    /// A plain white block, often used for testing.
    WHITE = 4,

    /// Bedrock-like stone placed under the terrain surface.
    STONE = 5,

    /// A non-empty block that does not hide its neighbors' faces.
    GLASS = 6,

    /// Loose sand used near the base height.
    SAND = 7,
}

impl BlockType {
    /// Converts a stored `BlockId` to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the identifier does not name a known type
    pub fn from_id(id: BlockId) -> Option<Self> {
        FromPrimitive::from_u16(id)
    }

    /// The identifier stored in chunk grids for this type.
    pub fn id(self) -> BlockId {
        self as BlockId
    }

    /// Returns `true` if a face pointing into this block is hidden.
    pub fn is_opaque(self) -> bool {
        !matches!(self, BlockType::AIR | BlockType::GLASS)
    }

    /// Draws a random non-air, opaque block type from the given generator.
    ///
    /// Used by procedural generators so that output is reproducible per seed.
    pub fn random_solid(rng: &mut fastrand::Rng) -> Self {
        match rng.u8(0..4) {
            0 => BlockType::DIRT,
            1 => BlockType::GRASS,
            2 => BlockType::WOOD,
            _ => BlockType::STONE,
        }
    }
}
