//! 3D Perlin noise generator producing cave-riddled terrain with overhangs.

use cgmath::{Point3, Vector3};
use noise::{NoiseFn, Perlin};

use super::{clamp_to_bounds, position_seed, WorldGenerator};
use crate::config::WorldBounds;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::EMPTY_BLOCK;
use crate::engine_state::voxels::chunk::Chunk;
use crate::error::GeneratorError;

/// Threshold above which Perlin noise is considered solid for terrain generation.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered empty for terrain generation.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Fills cells whose noise sample falls outside the band around zero.
///
/// Solid cells get a random block type drawn from a generator seeded by the world
/// seed and chunk position, so a chunk regenerates identically after eviction.
pub struct PerlinGenerator {
    perlin: Perlin,
    seed: u32,
}

impl PerlinGenerator {
    /// Creates a generator for the given world seed.
    pub fn new(seed: u32) -> Self {
        PerlinGenerator {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    /// Returns `true` if the block at a global coordinate is solid.
    pub fn is_solid_at(&self, block: Point3<i32>) -> bool {
        let sample = self.perlin.get(to_perlin_pos(block, PERLIN_SCALE_FACTOR));
        !(PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample)
    }
}

/// Converts a global block coordinate to a noise sampling coordinate.
fn to_perlin_pos(pos: Point3<i32>, scale_factor: f64) -> [f64; 3] {
    [
        pos.x as f64 * scale_factor,
        pos.y as f64 * scale_factor,
        pos.z as f64 * scale_factor,
    ]
}

impl WorldGenerator for PerlinGenerator {
    fn name(&self) -> &str {
        "perlin"
    }

    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        // Climb the origin column until there is headroom.
        let mut spawn = Point3::new(0, 0, 0);
        while spawn.y < 256
            && (self.is_solid_at(spawn) || self.is_solid_at(spawn + Vector3::unit_y()))
        {
            spawn.y += 1;
        }
        Ok(clamp_to_bounds(spawn, bounds))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        let position = chunk.position;
        let origin = chunk.world_origin();
        let mut rng = fastrand::Rng::with_seed(position_seed(
            self.seed,
            [position.x, position.y, position.z],
        ));

        chunk.fill_with(|local| {
            let block = Point3::new(
                origin.x + local.x as i32,
                origin.y + local.y as i32,
                origin.z + local.z as i32,
            );
            if self.is_solid_at(block) {
                BlockType::random_solid(&mut rng).id()
            } else {
                EMPTY_BLOCK
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regenerating_a_chunk_is_deterministic() {
        let generator = PerlinGenerator::new(3);
        let mut first = Chunk::new(Point3::new(2, -1, 5));
        let mut second = Chunk::new(Point3::new(2, -1, 5));
        generator.generate(&mut first).unwrap();
        generator.generate(&mut second).unwrap();
        assert_eq!(first.blocks(), second.blocks());
    }

    #[test]
    fn solidity_matches_noise_band() {
        let generator = PerlinGenerator::new(0);
        let mut chunk = Chunk::new(Point3::new(4, 0, -3));
        generator.generate(&mut chunk).unwrap();
        let origin = chunk.world_origin();
        for (local, _) in chunk.iter_blocks() {
            let block = Point3::new(
                origin.x + local.x as i32,
                origin.y + local.y as i32,
                origin.z + local.z as i32,
            );
            assert!(generator.is_solid_at(block));
        }
    }

    #[test]
    fn spawn_has_headroom() {
        let mut generator = PerlinGenerator::new(11);
        let spawn = generator.prepare(&WorldBounds::UNBOUNDED).unwrap();
        if spawn.y < 256 {
            assert!(!generator.is_solid_at(spawn));
        }
    }
}
