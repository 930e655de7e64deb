//! # Voxel Streamer Entry Point
//!
//! Runs a streaming world with a simulated consumer: the viewer walks along the X
//! axis, the consumer swaps and caches geometry every frame, and every so often a
//! block near the viewer is edited.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- config.json
//! ```

use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::time::Duration;

use cgmath::Point3;
use log::{error, info};
use voxel_streamer::{BlockType, ChunkManager, EngineConfig, EngineError, GeneratorRegistry, MeshCache};
use web_time::Instant;

/// Number of simulated frames.
const FRAME_COUNT: u32 = 600;
/// Frame pacing of the simulated consumer.
const FRAME_TIME: Duration = Duration::from_millis(16);
/// Viewer speed in blocks per frame.
const VIEWER_SPEED: f32 = 0.5;
/// An edit is made every this many frames.
const EDIT_INTERVAL: u32 = 30;

fn main() -> ExitCode {
    voxel_streamer::init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EngineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let cache_capacity = NonZeroUsize::new(config.mesh_cache_capacity).unwrap_or(NonZeroUsize::MIN);
    let has_store = config.save_directory.is_some();

    let manager = ChunkManager::start(config, &GeneratorRegistry::new())?;
    let mut cache = MeshCache::new(cache_capacity);

    let spawn = manager.spawn_point();
    let mut viewer = Point3::new(spawn.x as f32, spawn.y as f32, spawn.z as f32);
    let started = Instant::now();
    let mut swaps = 0u32;
    let mut edits = 0u32;

    for frame in 0..FRAME_COUNT {
        viewer.x += VIEWER_SPEED;
        manager.set_viewer_position(viewer);

        if frame % EDIT_INTERVAL == 0 {
            let below = Point3::new(viewer.x.floor() as i32, spawn.y - 1, viewer.z.floor() as i32);
            match manager.set_block_at(below, BlockType::GLASS.id()) {
                Ok(Some(_)) => edits += 1,
                Ok(None) => {}
                Err(err) => log::warn!("Edit at {:?} rejected: {}", below, err),
            }
        }

        if manager.try_swap() {
            swaps += 1;
            cache.apply(&manager.read_buffer());
        }

        std::thread::sleep(FRAME_TIME);
    }

    info!(
        "{} frames in {:?}: {} swaps, {} rounds, {} edits, {} chunks loaded, {} meshes cached ({} vertices)",
        FRAME_COUNT,
        started.elapsed(),
        swaps,
        manager.rounds_completed(),
        edits,
        manager.loaded_chunk_count(),
        cache.len(),
        cache.vertex_count()
    );

    if has_store {
        manager.save_world()?;
    }
    manager.shutdown();
    Ok(())
}
