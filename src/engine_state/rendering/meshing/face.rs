use cgmath::Point3;

use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::{texture_index, BlockId};

/// Corner offsets from a cell's minimum corner, per side, as [ll, lr, ul, ur].
///
/// Indexed by `BlockSide as usize`. Each quad winds counter-clockwise when viewed
/// from outside the block.
const FACE_CORNERS: [[[i32; 3]; 4]; 6] = [
    // FRONT (-X)
    [[0, 0, 0], [0, 0, 1], [0, 1, 0], [0, 1, 1]],
    // BACK (+X)
    [[1, 0, 1], [1, 0, 0], [1, 1, 1], [1, 1, 0]],
    // BOTTOM (-Y)
    [[0, 0, 1], [0, 0, 0], [1, 0, 1], [1, 0, 0]],
    // TOP (+Y)
    [[0, 1, 0], [0, 1, 1], [1, 1, 0], [1, 1, 1]],
    // LEFT (-Z)
    [[1, 0, 0], [0, 0, 0], [1, 1, 0], [0, 1, 0]],
    // RIGHT (+Z)
    [[0, 0, 1], [1, 0, 1], [0, 1, 1], [1, 1, 1]],
];

/// UV coordinates in [ll, lr, ul, ur] order.
const CORNER_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

/// Corner order of the two triangles of a quad: ll, lr, ur, then ll, ur, ul.
const QUAD_TRIANGLES: [usize; 6] = [0, 1, 3, 0, 3, 2];

/// A single visible block face in chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Lower-left corner
    pub ll: Point3<i32>,
    /// Lower-right corner
    pub lr: Point3<i32>,
    /// Upper-left corner
    pub ul: Point3<i32>,
    /// Upper-right corner
    pub ur: Point3<i32>,
    /// The block this face belongs to
    pub block_id: BlockId,
    /// Which side of the block this face represents
    pub block_side: BlockSide,
}

impl Face {
    /// Creates the face on `block_side` of the cell at `cell`.
    pub fn new(cell: Point3<usize>, block_id: BlockId, block_side: BlockSide) -> Self {
        let origin = Point3::new(cell.x as i32, cell.y as i32, cell.z as i32);
        let corner = |index: usize| {
            let [dx, dy, dz] = FACE_CORNERS[block_side as usize][index];
            Point3::new(origin.x + dx, origin.y + dy, origin.z + dz)
        };
        Face {
            ll: corner(0),
            lr: corner(1),
            ul: corner(2),
            ur: corner(3),
            block_id,
            block_side,
        }
    }

    /// Appends the two triangles of this face.
    pub fn emit(&self, vertices: &mut Vec<Vertex>) {
        let corners = [self.ll, self.lr, self.ul, self.ur];
        let texture = texture_index(self.block_id, self.block_side);
        let normal = self.block_side.packed_normal();
        vertices.extend(
            QUAD_TRIANGLES
                .iter()
                .map(|&corner| Vertex::new(corners[corner], texture, CORNER_TEX_COORDS[corner], normal)),
        );
    }
}
