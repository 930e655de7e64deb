//! End-to-end tests of the threaded chunk manager.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use cgmath::Point3;
use voxel_streamer::config::WorldBounds;
use voxel_streamer::engine_state::voxels::chunk::Chunk;
use voxel_streamer::error::GeneratorError;
use voxel_streamer::{
    BlockType, ChunkManager, EngineConfig, GeneratorConfig, GeneratorRegistry, MeshCache,
    WorldGenerator,
};
use web_time::Instant;

const DEADLINE: Duration = Duration::from_secs(20);

fn config(generator: &str) -> EngineConfig {
    EngineConfig {
        worker_count: 3,
        target_radius: 2,
        vertical_radius: 1,
        generator: GeneratorConfig {
            name: String::from(generator),
            ..GeneratorConfig::default()
        },
        ..EngineConfig::default()
    }
}

/// Swaps until `done` holds, applying every swapped batch to `cache`.
fn run_until(
    manager: &ChunkManager,
    cache: &mut MeshCache,
    mut done: impl FnMut(&ChunkManager, &MeshCache) -> bool,
) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if manager.try_swap() {
            cache.apply(&manager.read_buffer());
        }
        if done(manager, cache) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn cache() -> MeshCache {
    MeshCache::new(NonZeroUsize::new(1024).unwrap())
}

fn region(center: Point3<i32>, radius: i32, vertical: i32) -> Vec<Point3<i32>> {
    let mut positions = Vec::new();
    for x in -radius..=radius {
        for y in -vertical..=vertical {
            for z in -radius..=radius {
                positions.push(Point3::new(center.x + x, center.y + y, center.z + z));
            }
        }
    }
    positions
}

fn scratch_directory(name: &str) -> PathBuf {
    let directory = std::env::temp_dir().join(format!("voxel-streamer-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&directory);
    directory
}

#[test]
fn streaming_converges_on_the_load_region() {
    let manager = ChunkManager::start(config("terrain"), &GeneratorRegistry::new()).unwrap();
    let center = manager.viewer_chunk();
    let target = manager.config().target_radius;
    let mut cache = cache();

    assert!(run_until(&manager, &mut cache, |m, _| m.rounds_completed() >= target as u64));
    for position in region(center, target, 1) {
        assert!(manager.is_loaded(position), "{:?} not loaded", position);
    }
    assert_eq!(manager.current_radius(), target);
    assert_eq!(manager.loaded_chunk_count(), region(center, target, 1).len());
}

#[test]
fn every_loaded_chunk_reaches_the_consumer() {
    let manager = ChunkManager::start(config("checkerboard"), &GeneratorRegistry::new()).unwrap();
    let center = manager.viewer_chunk();
    let mut cache = cache();

    // Rounds after convergence only rebuild what is dirty, so once a swap follows
    // the last loading round the cache holds every chunk.
    let expected: HashSet<_> = region(center, 2, 1).into_iter().collect();
    assert!(run_until(&manager, &mut cache, |m, cache| {
        m.rounds_completed() >= 4 && cache.iter().map(|(p, _)| *p).collect::<HashSet<_>>() == expected
    }));
    for position in &expected {
        assert!(!cache.get(position).unwrap().is_empty());
    }
}

#[test]
fn moving_viewer_removes_old_meshes() {
    let manager = ChunkManager::start(config("solid"), &GeneratorRegistry::new()).unwrap();
    let mut cache = cache();
    assert!(run_until(&manager, &mut cache, |m, _| m.rounds_completed() >= 2));

    manager.set_viewer_position(Point3::new(16.0 * 20.0, 0.0, 0.0));
    assert!(run_until(&manager, &mut cache, |m, cache| {
        m.is_loaded(Point3::new(20, 0, 0))
            && !m.is_loaded(Point3::new(0, 0, 0))
            && cache.get(&Point3::new(0, 0, 0)).is_none()
    }));
}

#[test]
fn edit_is_visible_after_the_next_swap() {
    let manager = ChunkManager::start(config("empty"), &GeneratorRegistry::new()).unwrap();
    let mut cache = cache();
    assert!(run_until(&manager, &mut cache, |m, _| m.is_loaded(Point3::new(0, 0, 0))));

    let old = manager.set_block_at(Point3::new(3, 4, 5), BlockType::STONE.id()).unwrap();
    assert_eq!(old, Some(BlockType::AIR.id()));

    assert!(run_until(&manager, &mut cache, |_, cache| {
        cache.get(&Point3::new(0, 0, 0)).map(|g| g.len()) == Some(36)
    }));
}

#[test]
fn saved_edits_survive_a_restart() {
    let directory = scratch_directory("restart");
    let mut config = config("solid");
    config.save_directory = Some(directory.clone());
    let edited = Point3::new(-3, 7, 2);

    {
        let manager = ChunkManager::start(config.clone(), &GeneratorRegistry::new()).unwrap();
        let mut cache = cache();
        assert!(run_until(&manager, &mut cache, |m, _| m.is_loaded(Point3::new(-1, 0, 0))));
        manager.set_block_at(edited, BlockType::SAND.id()).unwrap();
        assert!(manager.save_world().unwrap() > 0);
        manager.shutdown();
    }

    let manager = ChunkManager::start(config, &GeneratorRegistry::new()).unwrap();
    let mut cache = cache();
    assert!(run_until(&manager, &mut cache, |m, _| m.is_loaded(Point3::new(-1, 0, 0))));
    assert_eq!(manager.get_block_at(edited), Some(BlockType::SAND.id()));
    assert_eq!(manager.get_block_at(Point3::new(0, 0, 0)), Some(BlockType::DIRT.id()));

    drop(manager);
    let _ = std::fs::remove_dir_all(directory);
}

/// Fails every chunk with a positive X coordinate.
struct FlakyGenerator;

impl WorldGenerator for FlakyGenerator {
    fn name(&self) -> &str {
        "flaky"
    }

    fn prepare(&mut self, _bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        Ok(Point3::new(0, 0, 0))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        if chunk.position.x > 0 {
            return Err(GeneratorError::ChunkFailed {
                position: chunk.position,
                reason: String::from("flaky"),
            });
        }
        chunk.fill_with(|_| BlockType::STONE.id());
        Ok(())
    }
}

#[test]
fn failed_chunks_load_empty_without_stopping_streaming() {
    let mut registry = GeneratorRegistry::new();
    registry.register(
        "flaky",
        |_: &GeneratorConfig| -> Result<Box<dyn WorldGenerator>, GeneratorError> {
            Ok(Box::new(FlakyGenerator))
        },
    );
    let manager = ChunkManager::start(config("flaky"), &registry).unwrap();
    let mut cache = cache();

    assert!(run_until(&manager, &mut cache, |m, _| m.rounds_completed() >= 3));
    assert_eq!(manager.get_block_at(Point3::new(20, 0, 0)), Some(BlockType::AIR.id()));
    assert_eq!(manager.get_block_at(Point3::new(-20, 0, 0)), Some(BlockType::STONE.id()));
    assert!(cache.get(&Point3::new(1, 0, 0)).map_or(true, |g| g.is_empty()));
}

/// Panics while generating the chunk at (1, 0, 0).
struct PanickingGenerator;

impl WorldGenerator for PanickingGenerator {
    fn name(&self) -> &str {
        "panicking"
    }

    fn prepare(&mut self, _bounds: &WorldBounds) -> Result<Point3<i32>, GeneratorError> {
        Ok(Point3::new(0, 0, 0))
    }

    fn generate(&self, chunk: &mut Chunk) -> Result<(), GeneratorError> {
        if chunk.position == Point3::new(1, 0, 0) {
            panic!("generator bug");
        }
        chunk.fill_with(|_| BlockType::STONE.id());
        Ok(())
    }
}

#[test]
fn panicking_generator_neither_stalls_streaming_nor_shutdown() {
    let mut registry = GeneratorRegistry::new();
    registry.register(
        "panicking",
        |_: &GeneratorConfig| -> Result<Box<dyn WorldGenerator>, GeneratorError> {
            Ok(Box::new(PanickingGenerator))
        },
    );
    let mut config = config("panicking");
    config.worker_count = 2;
    let manager = ChunkManager::start(config, &registry).unwrap();
    let mut cache = cache();

    assert!(run_until(&manager, &mut cache, |m, _| m.rounds_completed() >= 3));
    assert_eq!(manager.get_block_at(Point3::new(16, 0, 0)), Some(BlockType::AIR.id()));
    assert_eq!(manager.get_block_at(Point3::new(-16, 0, 0)), Some(BlockType::STONE.id()));

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        manager.shutdown();
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(DEADLINE).is_ok(), "shutdown did not return");
}

#[test]
fn failing_prepare_aborts_start() {
    let mut config = config("terrain");
    config.generator.height_scale = -1.0;
    assert!(ChunkManager::start(config, &GeneratorRegistry::new()).is_err());
}

#[test]
fn shutdown_while_streaming_returns_promptly() {
    let manager = ChunkManager::start(config("perlin"), &GeneratorRegistry::new()).unwrap();
    let mut cache = cache();
    assert!(run_until(&manager, &mut cache, |m, _| m.rounds_completed() >= 1));

    let started = Instant::now();
    manager.shutdown();
    assert!(started.elapsed() < DEADLINE);

    let rounds = manager.rounds_completed();
    manager.try_swap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(manager.rounds_completed(), rounds);
    assert_eq!(manager.set_block_at(Point3::new(0, 0, 0), BlockType::DIRT.id()).unwrap(), None);
}
