//! # Heightmap Terrain
//!
//! Surface terrain from a 2D Perlin heightmap.
//!
//! Base pass: stone deep down, a few layers of dirt (sand in low basins) up to
//! the surface, air above.
//! Decoration pass: exposed dirt becomes grass, and a sparse set of columns get a
//! short wood trunk on top of the surface.
//!
//! Both passes derive everything from the heightmap and the world seed, so a
//! trunk crossing a chunk boundary is completed by the chunk above regardless of
//! which chunk is generated first.

use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use super::{clamp_to_bounds, position_seed, WorldGenerator};
use crate::config::{GeneratorConfig, WorldBounds};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::EMPTY_BLOCK;
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z};
use crate::error::GeneratorError;

/// Horizontal scale of the heightmap noise.
pub const HEIGHTMAP_SCALE_FACTOR: f64 = 0.01;
/// Thickness of the dirt layer above the stone.
pub const DIRT_DEPTH: i32 = 3;
/// Height of a wood trunk.
pub const TRUNK_HEIGHT: i32 = 4;
/// One in this many surface columns carries a trunk.
pub const TRUNK_RARITY: u64 = 97;

/// Heightmap-based terrain generator.
pub struct TerrainGenerator {
    heightmap: Perlin,
    seed: u32,
    base_height: i32,
    height_scale: f64,
}

impl TerrainGenerator {
    /// Creates a generator from its settings. Settings are checked in `prepare`.
    pub fn new(config: &GeneratorConfig) -> Self {
        TerrainGenerator {
            heightmap: Perlin::new(config.seed),
            seed: config.seed,
            base_height: config.base_height,
            height_scale: config.height_scale,
        }
    }

    /// Global Y of the first air cell above the surface of a column.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let sample = self.heightmap.get([
            x as f64 * HEIGHTMAP_SCALE_FACTOR,
            z as f64 * HEIGHTMAP_SCALE_FACTOR,
        ]);
        self.base_height + (sample * self.height_scale).round() as i32
    }

    fn has_trunk(&self, x: i32, z: i32) -> bool {
        position_seed(self.seed, [x, 0, z]) % TRUNK_RARITY == 0
    }

    fn column_heights(&self, origin: Point3<i32>) -> Vec<i32> {
        let mut heights = Vec::with_capacity(CHUNK_DIMENSION_X * CHUNK_DIMENSION_Z);
        for x in 0..CHUNK_DIMENSION_X as i32 {
            for z in 0..CHUNK_DIMENSION_Z as i32 {
                heights.push(self.surface_height(origin.x + x, origin.z + z));
            }
        }
        heights
    }
}

impl WorldGenerator for TerrainGenerator {
    fn name(&self) -> &str {
        "terrain"
    }

    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        if !(self.height_scale.is_finite() && self.height_scale > 0.0) {
            return Err(GeneratorError::InvalidSettings(format!(
                "height_scale must be a positive number, got {}",
                self.height_scale
            )));
        }
        let spawn = Point3::new(0, self.surface_height(0, 0) + 1, 0);
        Ok(clamp_to_bounds(spawn, bounds))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        let origin = chunk.world_origin();
        let heights = self.column_heights(origin);

        chunk.fill_with(|local| {
            let height = heights[local.x * CHUNK_DIMENSION_Z + local.z];
            let y = origin.y + local.y as i32;
            if y >= height {
                EMPTY_BLOCK
            } else if y < height - DIRT_DEPTH {
                BlockType::STONE.id()
            } else if height <= self.base_height - DIRT_DEPTH {
                BlockType::SAND.id()
            } else {
                BlockType::DIRT.id()
            }
        });
        Ok(())
    }

    fn decorate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        let origin = chunk.world_origin();
        let heights = self.column_heights(origin);
        let top = origin.y + CHUNK_DIMENSION_Y as i32;

        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                let height = heights[x * CHUNK_DIMENSION_Z + z];

                let surface = height - 1;
                if surface >= origin.y && surface < top {
                    let local_y = (surface - origin.y) as usize;
                    if chunk.get_block(x, local_y, z) == BlockType::DIRT.id() {
                        chunk.fill_cell(x, local_y, z, BlockType::GRASS.id());
                    }
                }

                if self.has_trunk(origin.x + x as i32, origin.z + z as i32) {
                    for y in height.max(origin.y)..(height + TRUNK_HEIGHT).min(top) {
                        chunk.fill_cell(x, (y - origin.y) as usize, z, BlockType::WOOD.id());
                    }
                }
            }
        }
        Ok(())
    }
}
