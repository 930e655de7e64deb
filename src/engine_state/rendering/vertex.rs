//! Vertex data structures for chunk geometry.
//!
//! This module defines the vertex format handed to the renderer and a helper for
//! viewing a vertex list as raw bytes for upload.

use cgmath::Point3;

/// A vertex of chunk geometry.
///
/// Positions are chunk-local block corners; the renderer offsets them by the
/// chunk's world origin.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Texture Index: u32 (4 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Normal: u32, signed 10:10:10:2 (4 bytes)
///
/// Total size: 28 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// X coordinate in chunk space
    x: i32,
    /// Y coordinate in chunk space
    y: i32,
    /// Z coordinate in chunk space
    z: i32,
    /// Index of the texture in the texture array
    texture_index: u32,
    /// UV texture coordinates (normalized 0.0-1.0)
    tex_coords: [f32; 2],
    /// Outward face normal, packed
    normal: u32,
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `pos` - Corner position in chunk space
    /// * `texture_index` - Index of the texture in the texture array
    /// * `tex_coords` - UV coordinates of the corner
    /// * `normal` - Packed outward normal of the face
    pub fn new(pos: Point3<i32>, texture_index: u32, tex_coords: [f32; 2], normal: u32) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            texture_index,
            tex_coords,
            normal,
        }
    }

    /// Corner position in chunk space.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Index of the texture in the texture array.
    pub fn texture_index(&self) -> u32 {
        self.texture_index
    }

    /// UV coordinates of the corner.
    pub fn tex_coords(&self) -> [f32; 2] {
        self.tex_coords
    }

    /// Packed outward normal.
    pub fn normal(&self) -> u32 {
        self.normal
    }
}

/// Views a vertex list as the bytes a GPU buffer upload expects.
pub fn vertex_bytes(vertices: &[Vertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
