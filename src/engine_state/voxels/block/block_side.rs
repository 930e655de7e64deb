//! # Block Side Module
//!
//! This module defines the six faces of a voxel block, their outward directions and
//! the packed normals written into vertices.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value used to index per-face tables
/// such as texture indices and neighbor arrays.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing negative X)
    FRONT = 0,

    /// The back face (facing positive X)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative Z)
    LEFT = 4,

    /// The right face (facing positive Z)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The unit step from a cell to the cell this face looks into.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(-1, 0, 0),
            BlockSide::BACK => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(0, 0, -1),
            BlockSide::RIGHT => Vector3::new(0, 0, 1),
        }
    }

    /// The face on the other side of a shared boundary.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
        }
    }

    /// The outward normal packed as signed 10:10:10:2.
    ///
    /// Each component occupies ten bits in two's complement scaled to 511, so a
    /// shader can unpack it with a `snorm` attribute format.
    pub fn packed_normal(self) -> u32 {
        pack_normal(self.offset())
    }
}

/// Packs an axis-aligned unit normal as signed 10:10:10:2 (w = 0).
pub fn pack_normal(normal: Vector3<i32>) -> u32 {
    let pack = |component: i32| ((component * 511) as u32) & 0x3FF;
    pack(normal.x) | (pack(normal.y) << 10) | (pack(normal.z) << 20)
}

/// Reverses `pack_normal` for axis-aligned unit normals.
pub fn unpack_normal(packed: u32) -> Vector3<i32> {
    let unpack = |bits: u32| {
        // Sign-extend the ten bit field before rescaling.
        let signed = ((bits << 22) as i32) >> 22;
        signed / 511
    };
    Vector3::new(
        unpack(packed & 0x3FF),
        unpack((packed >> 10) & 0x3FF),
        unpack((packed >> 20) & 0x3FF),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_faces_cancel_out() {
        for side in BlockSide::all() {
            assert_eq!(side.opposite().opposite(), side);
            assert_eq!(side.offset() + side.opposite().offset(), Vector3::new(0, 0, 0));
        }
    }

    #[test]
    fn packed_normals_unpack_to_offsets() {
        for side in BlockSide::all() {
            assert_eq!(unpack_normal(side.packed_normal()), side.offset());
        }
    }

    #[test]
    fn packed_normals_are_distinct() {
        let mut normals: Vec<u32> = BlockSide::all().iter().map(|s| s.packed_normal()).collect();
        normals.sort_unstable();
        normals.dedup();
        assert_eq!(normals.len(), 6);
    }
}
