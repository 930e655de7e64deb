//! Simple fixed-pattern generators, mostly used for testing and benchmarks.

use cgmath::Point3;

use super::{clamp_to_bounds, WorldGenerator};
use crate::config::WorldBounds;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::EMPTY_BLOCK;
use crate::engine_state::voxels::chunk::Chunk;
use crate::error::GeneratorError;

/// Generates chunks that are entirely air.
pub struct EmptyGenerator;

impl WorldGenerator for EmptyGenerator {
    fn name(&self) -> &str {
        "empty"
    }

    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        Ok(clamp_to_bounds(Point3::new(0, 0, 0), bounds))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        chunk.clear();
        Ok(())
    }
}

/// Generates chunks completely filled with dirt.
pub struct SolidGenerator;

impl WorldGenerator for SolidGenerator {
    fn name(&self) -> &str {
        "solid"
    }

    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        Ok(clamp_to_bounds(Point3::new(0, 0, 0), bounds))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        chunk.fill_with(|_| BlockType::DIRT.id());
        Ok(())
    }
}

/// Generates a 3D checkerboard of dirt and air.
///
/// Parity is taken from global block coordinates, so the pattern continues
/// across chunk boundaries.
pub struct CheckerboardGenerator;

impl WorldGenerator for CheckerboardGenerator {
    fn name(&self) -> &str {
        "checkerboard"
    }

    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        Ok(clamp_to_bounds(Point3::new(0, 0, 0), bounds))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        let origin = chunk.world_origin();
        chunk.fill_with(|local| {
            let parity = (origin.x + local.x as i32)
                + (origin.y + local.y as i32)
                + (origin.z + local.z as i32);
            if parity.rem_euclid(2) == 0 {
                BlockType::DIRT.id()
            } else {
                EMPTY_BLOCK
            }
        });
        Ok(())
    }
}
