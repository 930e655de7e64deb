//! # World Generation
//!
//! Pluggable chunk generators selected by name.
//!
//! A generator is prepared once when the world is created (where it may reject
//! its settings) and is then shared by every mesh worker, so `generate` and
//! `decorate` take `&self` and must be safe to call concurrently for different
//! chunks.
//!
//! Built-in generators are listed in a compile-time `phf` map; further
//! generators can be registered at runtime on a `GeneratorRegistry`.

use std::collections::HashMap;

use cgmath::Point3;
use phf::phf_map;

use super::chunk::Chunk;
use crate::config::{GeneratorConfig, WorldBounds};
use crate::error::GeneratorError;

pub mod patterns;
pub mod perlin;
pub mod terrain;

/// A chunk generation strategy.
pub trait WorldGenerator: Send + Sync {
    /// Registry name of the generator.
    fn name(&self) -> &str;

    /// Called once before streaming begins.
    ///
    /// # Returns
    /// The spawn point in block coordinates
    fn prepare(&mut self, bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError>;

    /// Overwrites every cell of `chunk` with base terrain for its position.
    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError>;

    /// Runs the passes that follow base terrain (surface cover, structures).
    fn decorate(&self, _chunk: &mut Chunk) -> Result<(), GeneratorError> {
        Ok(())
    }
}

/// Constructor of a runtime-registered generator.
pub type GeneratorConstructor =
    Box<dyn Fn(&GeneratorConfig) -> Result<Box<dyn WorldGenerator>, GeneratorError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratorKind {
    Empty,
    Solid,
    Checkerboard,
    Perlin,
    Terrain,
}

/// Generators available without registration.
static BUILTIN_GENERATORS: phf::Map<&'static str, GeneratorKind> = phf_map! {
    "empty" => GeneratorKind::Empty,
    "solid" => GeneratorKind::Solid,
    "checkerboard" => GeneratorKind::Checkerboard,
    "perlin" => GeneratorKind::Perlin,
    "terrain" => GeneratorKind::Terrain,
};

/// Name-keyed lookup of generator constructors.
#[derive(Default)]
pub struct GeneratorRegistry {
    custom: HashMap<String, GeneratorConstructor>,
}

impl GeneratorRegistry {
    /// A registry holding only the built-in generators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator under `name`, shadowing a built-in of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&GeneratorConfig) -> Result<Box<dyn WorldGenerator>, GeneratorError>
            + Send
            + Sync
            + 'static,
    {
        self.custom.insert(name.into(), Box::new(constructor));
    }

    /// Every name `create` accepts, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_GENERATORS
            .keys()
            .map(|name| name.to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Builds the generator named by `config.name`.
    ///
    /// The generator is not prepared yet.
    pub fn create(&self, config: &GeneratorConfig) -> Result<Box<dyn WorldGenerator>, GeneratorError> {
        if let Some(constructor) = self.custom.get(&config.name) {
            return constructor(config);
        }

        let kind = BUILTIN_GENERATORS
            .get(config.name.as_str())
            .copied()
            .ok_or_else(|| GeneratorError::UnknownGenerator(config.name.clone()))?;

        let generator: Box<dyn WorldGenerator> = match kind {
            GeneratorKind::Empty => Box::new(patterns::EmptyGenerator),
            GeneratorKind::Solid => Box::new(patterns::SolidGenerator),
            GeneratorKind::Checkerboard => Box::new(patterns::CheckerboardGenerator),
            GeneratorKind::Perlin => Box::new(perlin::PerlinGenerator::new(config.seed)),
            GeneratorKind::Terrain => Box::new(terrain::TerrainGenerator::new(config)),
        };
        Ok(generator)
    }
}

/// Mixes a world seed with integer coordinates into a per-location seed.
pub(crate) fn position_seed(seed: u32, coords: [i32; 3]) -> u64 {
    let mut state = u64::from(seed) ^ 0x9E37_79B9_7F4A_7C15;
    for coordinate in coords {
        state ^= coordinate as u32 as u64;
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        state = (state ^ (state >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        state = (state ^ (state >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        state ^= state >> 31;
    }
    state
}

/// Places a block coordinate inside the bounds, per axis.
pub(crate) fn clamp_to_bounds(block: Point3<i32>, bounds: &WorldBounds) -> Point3<i32> {
    if bounds.is_unbounded() {
        return block;
    }
    let extents = crate::engine_state::voxels::chunk::CHUNK_EXTENT;
    let coords = [block.x, block.y, block.z];
    let clamped: Vec<i32> = (0..3)
        .map(|axis| {
            let low = i64::from(bounds.min[axis]) * i64::from(extents[axis]);
            let high = (i64::from(bounds.max[axis]) + 1) * i64::from(extents[axis]) - 1;
            i64::from(coords[axis])
                .clamp(low, high)
                .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        })
        .collect();
    Point3::new(clamped[0], clamped[1], clamped[2])
}
